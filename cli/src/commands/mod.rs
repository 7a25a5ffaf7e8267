mod print;
mod run;

#[derive(clap::Subcommand)]
pub enum Subcommand {
    /// Load a program and an optional memory image, then run to completion
    Run(self::run::RunOpt),

    /// Print a program as decoded, flagging undecodable lines
    Print(self::print::PrintOpt),
}

impl Subcommand {
    /// Run a subcommand
    pub fn exec(self) -> anyhow::Result<()> {
        match self {
            Subcommand::Run(opt) => opt.exec(),
            Subcommand::Print(opt) => opt.exec(),
        }
    }
}

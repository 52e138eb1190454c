use super::Parser;
use clap::Subcommand;

#[derive(Parser, Debug)]
#[command(name = "login-guard", version, about = "Failed-login lockout guard")]
pub struct Cli {
    #[arg(long)]
    pub settings: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print the block status for an email.
    Status {
        #[arg(long)]
        email: String,
    },
    /// Attempt a login through the guard. Reads the password from stdin
    /// when `--password` is absent.
    Login {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: Option<String>,
    },
    /// Follow the lockout countdown until login is allowed again.
    Watch {
        #[arg(long)]
        email: String,
    },
    /// Run the development auth backend.
    Serve,
}

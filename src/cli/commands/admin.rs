use clap::{Arg, Command};

pub const ARG_ADMIN_USERNAME: &str = "admin-username";
pub const ARG_ADMIN_PASSWORD: &str = "admin-password";

/// Admin panel credentials. Leaving both unset disables the admin routes.
#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_ADMIN_USERNAME)
                .long(ARG_ADMIN_USERNAME)
                .help("Admin panel username")
                .env("REGISTRAR_ADMIN_USERNAME")
                .requires(ARG_ADMIN_PASSWORD),
        )
        .arg(
            Arg::new(ARG_ADMIN_PASSWORD)
                .long(ARG_ADMIN_PASSWORD)
                .help("Admin panel password")
                .env("REGISTRAR_ADMIN_PASSWORD")
                .hide_env_values(true)
                .requires(ARG_ADMIN_USERNAME),
        )
}

use crate::cli::{
    actions::{server::Args, Action},
    commands::{
        ARG_ADMIN_PASSWORD, ARG_ADMIN_USERNAME, ARG_BCRYPT_COST, ARG_DSN, ARG_FRONTEND_ORIGIN,
        ARG_NO_LEGACY_PLAINTEXT, ARG_PORT, ARG_STUDENT_DOMAIN,
    },
};
use crate::identity::{hasher::DEFAULT_BCRYPT_COST, identifier::DEFAULT_STUDENT_DOMAIN};
use anyhow::{bail, Result};
use secrecy::SecretString;

/// # Errors
/// Returns an error if required arguments are missing or inconsistent.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let port = matches.get_one::<u16>(ARG_PORT).copied().unwrap_or(5000);
    let dsn = matches.get_one::<String>(ARG_DSN).cloned();
    let student_domain = matches
        .get_one::<String>(ARG_STUDENT_DOMAIN)
        .cloned()
        .unwrap_or_else(|| DEFAULT_STUDENT_DOMAIN.to_string());
    let bcrypt_cost = matches
        .get_one::<u32>(ARG_BCRYPT_COST)
        .copied()
        .unwrap_or(DEFAULT_BCRYPT_COST);

    if student_domain.trim().trim_start_matches('@').is_empty() {
        bail!("--{ARG_STUDENT_DOMAIN} must not be empty");
    }

    let admin = match (
        matches.get_one::<String>(ARG_ADMIN_USERNAME),
        matches.get_one::<String>(ARG_ADMIN_PASSWORD),
    ) {
        (Some(username), Some(password)) if !username.is_empty() && !password.is_empty() => {
            Some((username.clone(), SecretString::from(password.clone())))
        }
        (None, None) => None,
        _ => bail!("--{ARG_ADMIN_USERNAME} and --{ARG_ADMIN_PASSWORD} must be set together"),
    };

    Ok(Action::Server(Args {
        port,
        dsn,
        student_domain,
        bcrypt_cost,
        legacy_plaintext: !matches.get_flag(ARG_NO_LEGACY_PLAINTEXT),
        admin,
        frontend_origin: matches.get_one::<String>(ARG_FRONTEND_ORIGIN).cloned(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::commands;

    fn dispatch(args: &[&str]) -> Result<Action> {
        let matches = commands::new().try_get_matches_from(args)?;
        handler(&matches)
    }

    #[test]
    fn builds_server_args() -> Result<()> {
        temp_env::with_vars_unset(
            [
                "REGISTRAR_DSN",
                "REGISTRAR_ADMIN_USERNAME",
                "REGISTRAR_ADMIN_PASSWORD",
                "REGISTRAR_NO_LEGACY_PLAINTEXT",
                "REGISTRAR_BCRYPT_COST",
                "REGISTRAR_STUDENT_DOMAIN",
            ],
            || {
                let Action::Server(args) = dispatch(&[
                    "registrar",
                    "--admin-username",
                    "admin",
                    "--admin-password",
                    "secret",
                    "--no-legacy-plaintext",
                ])?;

                assert_eq!(args.dsn, None);
                assert_eq!(args.bcrypt_cost, DEFAULT_BCRYPT_COST);
                assert_eq!(args.student_domain, DEFAULT_STUDENT_DOMAIN);
                assert!(!args.legacy_plaintext);
                assert_eq!(
                    args.admin.as_ref().map(|(username, _)| username.as_str()),
                    Some("admin")
                );
                Ok(())
            },
        )
    }

    #[test]
    fn rejects_blank_admin_credentials() {
        temp_env::with_vars_unset(
            ["REGISTRAR_ADMIN_USERNAME", "REGISTRAR_ADMIN_PASSWORD"],
            || {
                let result = dispatch(&[
                    "registrar",
                    "--admin-username",
                    "admin",
                    "--admin-password",
                    "",
                ]);
                assert!(result.is_err());
            },
        );
    }

    #[test]
    fn rejects_empty_student_domain() {
        temp_env::with_vars_unset(["REGISTRAR_STUDENT_DOMAIN"], || {
            assert!(dispatch(&["registrar", "--student-domain", "@"]).is_err());
        });
    }
}

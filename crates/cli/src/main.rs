//! Operator command-line tool.
//!
//! Runs with direct access to the data files, without a session. This is how the
//! first administrator account is created.

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::collections::BTreeSet;
use std::path::PathBuf;
use std::process::ExitCode;
use ybocs_core::{
    constants::EXPORT_FILENAME, severity_series, ClinicService, CoreConfig, DateFilter, Login,
    NewAccount, NonEmptyText, ResultFilter, Role, SymptomKey, YbocsError, SYMPTOM_GROUPS,
    YBOCS_ITEMS,
};

#[derive(Parser)]
#[command(name = "ybocs")]
#[command(about = "Y-BOCS clinic records CLI")]
struct Cli {
    /// Data directory (overrides YBOCS_DATA_DIR)
    #[arg(long, global = true)]
    data_dir: Option<String>,
    /// Credential document (overrides YBOCS_CREDENTIALS_FILE)
    #[arg(long, global = true)]
    credentials_file: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create an account
    CreateAccount {
        /// Login (letters, digits, '.', '-', '_')
        login: String,
        /// Display name
        display_name: String,
        /// Initial password
        password: String,
        /// Email (defaults to <login>@example.com)
        #[arg(long)]
        email: Option<String>,
        /// Role: admin or user
        #[arg(long, default_value = "user")]
        role: String,
        /// Do not require a password change at first login
        #[arg(long)]
        no_reset: bool,
    },
    /// List accounts
    ListAccounts,
    /// Set an account's password
    SetPassword {
        login: String,
        password: String,
        /// Require a password change at next login
        #[arg(long)]
        require_reset: bool,
    },
    /// Change an account's role
    SetRole {
        login: String,
        /// admin or user
        role: String,
    },
    /// Show symptom checklists (all patients when no login is given)
    Symptoms {
        login: Option<String>,
        /// Replace the checklist with these keys instead of showing it
        #[arg(long = "set", num_args = 0..)]
        set: Option<Vec<String>>,
    },
    /// Query the results ledger
    Results {
        #[arg(long)]
        login: Option<String>,
        /// Single day (YYYY-MM-DD)
        #[arg(long, conflicts_with_all = ["start", "end"])]
        date: Option<NaiveDate>,
        /// Range start (YYYY-MM-DD, inclusive)
        #[arg(long)]
        start: Option<NaiveDate>,
        /// Range end (YYYY-MM-DD, inclusive)
        #[arg(long)]
        end: Option<NaiveDate>,
        /// Exact symptom key
        #[arg(long)]
        symptom: Option<String>,
    },
    /// Export the full ledger as CSV
    Export {
        /// Output file, or '-' for stdout
        #[arg(long, default_value = EXPORT_FILENAME)]
        output: PathBuf,
    },
    /// Print the symptom catalog or the questionnaire
    Catalog {
        /// Print the Y-BOCS items instead of the symptom groups
        #[arg(long)]
        questionnaire: bool,
    },
}

fn parse_login(raw: &str) -> Result<Login, YbocsError> {
    Ok(Login::parse(raw)?)
}

fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let cfg = CoreConfig::from_values(
        cli.data_dir.or_else(|| std::env::var("YBOCS_DATA_DIR").ok()),
        cli.credentials_file
            .or_else(|| std::env::var("YBOCS_CREDENTIALS_FILE").ok()),
    )?;
    let service = ClinicService::new(&cfg);

    match cli.command {
        Some(Commands::CreateAccount {
            login,
            display_name,
            password,
            email,
            role,
            no_reset,
        }) => {
            let new = NewAccount {
                login: parse_login(&login)?,
                display_name: NonEmptyText::new(&display_name)?,
                email,
                initial_password: password,
                role: role.parse()?,
                force_password_reset: !no_reset,
            };
            let account = service
                .credentials()
                .create(new)
                .map_err(|e| format!("Error creating account: {}", e))?;
            println!(
                "Created {} account '{}' ({}){}",
                account.role,
                account.login,
                account.email,
                if account.force_password_reset {
                    ", password change required at first login"
                } else {
                    ""
                }
            );
        }
        Some(Commands::ListAccounts) => {
            let accounts = service.credentials().list()?;
            if accounts.is_empty() {
                println!("No accounts found.");
            } else {
                for account in accounts {
                    println!(
                        "{:<20} {:<6} {:<30} {}{}",
                        account.login,
                        account.role,
                        account.display_name,
                        account.email,
                        if account.force_password_reset {
                            " [reset pending]"
                        } else {
                            ""
                        }
                    );
                }
            }
        }
        Some(Commands::SetPassword {
            login,
            password,
            require_reset,
        }) => {
            let login = parse_login(&login)?;
            let result = if require_reset {
                service.credentials().set_temporary_password(&login, &password)
            } else {
                service.credentials().set_password(&login, &password)
            };
            let account = result.map_err(|e| format!("Error setting password: {}", e))?;
            println!(
                "Password updated for '{}'{}",
                account.login,
                if account.force_password_reset {
                    "; change required at next login"
                } else {
                    ""
                }
            );
        }
        Some(Commands::SetRole { login, role }) => {
            let login = parse_login(&login)?;
            let role: Role = role.parse()?;
            let account = service
                .credentials()
                .set_role(&login, role)
                .map_err(|e| format!("Error setting role: {}", e))?;
            println!("'{}' is now {}", account.login, account.role);
        }
        Some(Commands::Symptoms { login, set }) => match (login, set) {
            (Some(login), Some(raw_keys)) => {
                let login = parse_login(&login)?;
                let keys = raw_keys
                    .iter()
                    .map(|k| SymptomKey::parse(k))
                    .collect::<Result<BTreeSet<_>, _>>()?;
                service
                    .symptom_store()
                    .replace(&login, &keys)
                    .map_err(|e| format!("Error saving symptoms: {}", e))?;
                println!("Saved {} symptom(s) for '{}'", keys.len(), login);
            }
            (Some(login), None) => {
                let login = parse_login(&login)?;
                print_symptoms(&login, &service.symptom_store().get(&login));
            }
            (None, Some(_)) => return Err("--set requires a login".into()),
            (None, None) => {
                let patients = service.symptom_store().list_patients()?;
                if patients.is_empty() {
                    println!("No patients found.");
                }
                for (login, keys) in patients {
                    print_symptoms(&login, &keys);
                }
            }
        },
        Some(Commands::Results {
            login,
            date,
            start,
            end,
            symptom,
        }) => {
            let dates = match (date, start, end) {
                (Some(day), _, _) => Some(DateFilter::Day(day)),
                (None, None, None) => None,
                (None, start, end) => Some(DateFilter::Range {
                    start: start.unwrap_or(NaiveDate::MIN),
                    end: end.unwrap_or(NaiveDate::MAX),
                }),
            };
            let filter = ResultFilter {
                login: login.as_deref().map(parse_login).transpose()?,
                dates,
                symptom,
            };

            let rows = service.ledger().query(&filter)?;
            if rows.is_empty() {
                println!("No results found.");
            }
            for row in &rows {
                println!(
                    "{}  {:<16} {:>2} ({:<11}) {:?}  {}",
                    row.timestamp.format("%Y-%m-%d %H:%M:%S"),
                    row.login,
                    row.total,
                    row.band(),
                    row.scores.items(),
                    row.symptom
                );
            }
            if filter.login.is_some() && rows.len() > 1 {
                let series = severity_series(&rows);
                let totals: Vec<String> = series.iter().map(|p| p.total.to_string()).collect();
                println!("Trend: {}", totals.join(" -> "));
            }
        }
        Some(Commands::Export { output }) => {
            let bytes = service.ledger().export_csv()?;
            if output.as_os_str() == "-" {
                use std::io::Write;
                std::io::stdout().write_all(&bytes)?;
            } else {
                std::fs::write(&output, &bytes)?;
                println!("Exported ledger to {}", output.display());
            }
        }
        Some(Commands::Catalog { questionnaire }) => {
            if questionnaire {
                for (idx, item) in YBOCS_ITEMS.iter().enumerate() {
                    println!("q{}. {}", idx + 1, item.title);
                    for (score, anchor) in item.anchors.iter().enumerate() {
                        println!("    {} - {}", score, anchor);
                    }
                }
            } else {
                for group in SYMPTOM_GROUPS {
                    println!("{}", group.name);
                    for item in group.items {
                        println!("    {}:{}", group.name, item);
                    }
                }
            }
        }
        None => {
            println!("No command given. Use --help for usage.");
        }
    }

    Ok(())
}

fn print_symptoms(login: &Login, keys: &BTreeSet<SymptomKey>) {
    println!("{}", login);
    if keys.is_empty() {
        println!("    — brak —");
    }
    for key in keys {
        println!("    {}", key.label());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn cli(temp: &TempDir, args: &[&str]) -> Cli {
        let data_dir = temp.path().join("data");
        let credentials = temp.path().join("users.yaml");
        let mut argv = vec![
            "ybocs".to_string(),
            "--data-dir".to_string(),
            data_dir.display().to_string(),
            "--credentials-file".to_string(),
            credentials.display().to_string(),
        ];
        argv.extend(args.iter().map(|a| a.to_string()));
        Cli::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_failed_operations_return_errors() {
        let temp = TempDir::new().unwrap();
        let create = ["create-account", "jkowal", "Jan KOW", "Start123"];

        assert!(run(cli(&temp, &create)).is_ok());
        let err = run(cli(&temp, &create)).unwrap_err();
        assert!(err.to_string().contains("creating account"));

        assert!(run(cli(&temp, &["set-password", "ghost", "Temp999"])).is_err());
        assert!(run(cli(&temp, &["set-role", "ghost", "admin"])).is_err());
        assert!(run(cli(&temp, &["symptoms", "--set", "Kompulsje różne:Trichotillomania"])).is_err());
    }

    #[test]
    fn test_set_password_with_reset_flag() {
        let temp = TempDir::new().unwrap();
        run(cli(&temp, &["create-account", "jkowal", "Jan KOW", "Start123", "--no-reset"])).unwrap();
        run(cli(&temp, &["set-password", "jkowal", "Temp999", "--require-reset"])).unwrap();

        let cfg = CoreConfig::new(temp.path().join("data"), temp.path().join("users.yaml")).unwrap();
        let service = ClinicService::new(&cfg);
        let login = Login::parse("jkowal").unwrap();
        let account = service.credentials().get(&login).unwrap().unwrap();
        assert!(account.force_password_reset);
        assert!(service.credentials().verify(&login, "Temp999").unwrap());
    }
}

//! Terminal host for the lock screen.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand, ValueEnum};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;

use crate::error::Result;
use crate::lock::{
    is_valid_pin, AuthMode, BiometricAuthenticator, GuardConfig, GuardOutcome, GuardState, LockStatus,
    PinChangeProgress, SimulatedBiometric, PIN_LENGTH,
};
use crate::state::AppSession;

/// Aura lock screen
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Args {
    /// Directory holding the secure store file
    #[arg(long, default_value = ".aura")]
    data_dir: PathBuf,

    /// Do not accept the built-in recovery PIN
    #[arg(long)]
    no_recovery_pin: bool,

    /// Behave like a device without a biometric sensor
    #[arg(long)]
    no_biometric: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// First-run setup: record the monthly salary and choose a PIN
    Setup {
        #[arg(long)]
        salary: f64,
        #[arg(long)]
        pin: String,
    },
    /// Show lock status and lockout state
    Status {
        /// Print as JSON
        #[arg(long)]
        json: bool,
        /// Resolve the auto theme as if the system used a light scheme
        #[arg(long)]
        light: bool,
    },
    /// Unlock. Without --pin, runs an interactive keypad
    Unlock {
        #[arg(long)]
        pin: Option<String>,
    },
    /// Change the access PIN
    ChangePin {
        #[arg(long)]
        current: String,
        #[arg(long)]
        new: String,
        #[arg(long)]
        confirm: String,
    },
    /// Erase all app data (requires the PIN)
    Reset {
        #[arg(long)]
        pin: String,
    },
    /// Theme preferences
    Theme {
        #[command(subcommand)]
        action: ThemeAction,
    },
}

#[derive(Subcommand, Debug)]
enum ThemeAction {
    /// Switch between bordeaux and emerald (turns auto theme off)
    Toggle,
    /// Follow the system colour scheme
    Auto { state: Switch },
}

#[derive(ValueEnum, Debug, Clone, Copy)]
enum Switch {
    On,
    Off,
}

impl Args {
    fn guard_config(&self) -> GuardConfig {
        let config = GuardConfig::default();
        if self.no_recovery_pin {
            config.without_recovery_pin()
        } else {
            config
        }
    }

    fn biometric(&self) -> Arc<dyn BiometricAuthenticator> {
        if self.no_biometric {
            Arc::new(SimulatedBiometric::unavailable())
        } else {
            Arc::new(SimulatedBiometric::new())
        }
    }
}

/// Run one command against the store in `--data-dir`.
pub async fn execute(args: Args) -> anyhow::Result<()> {
    let mut session = AppSession::open_in(&args.data_dir, args.biometric(), args.guard_config())
        .await
        .with_context(|| format!("Failed to open store in {:?}", args.data_dir))?;
    info!("Lock status: {}", session.status());

    match args.command {
        Command::Setup { salary, pin } => {
            session.setup(salary, &pin).await?;
            println!("Setup complete. App unlocked.");
        }
        Command::Status { json, light } => {
            let snapshot = session.snapshot(!light);
            if json {
                println!("{}", serde_json::to_string_pretty(&snapshot)?);
            } else {
                println!("Status:   {}", snapshot.status);
                println!("Guard:    {}", snapshot.guard_state);
                println!("Attempts: {}/{}", snapshot.attempts, snapshot.max_attempts);
                if snapshot.guard_state == GuardState::Locked {
                    println!("Locked out for {}s", snapshot.time_left);
                }
                println!("Theme:    {}", snapshot.theme);
            }
        }
        Command::Unlock { pin: Some(pin) } => {
            require_configured(&session)?;
            unlock_with_pin(&mut session, &pin).await?;
            println!("Unlocked.");
        }
        Command::Unlock { pin: None } => {
            require_configured(&session)?;
            if run_keypad(&mut session).await? {
                println!("Unlocked.");
            }
        }
        Command::ChangePin {
            current,
            new,
            confirm,
        } => {
            require_configured(&session)?;
            unlock_with_pin(&mut session, &current).await?;
            let mut change = session.begin_pin_change()?;
            for input in [&current, &new, &confirm] {
                if change.submit(input).await? == PinChangeProgress::Changed {
                    println!("PIN changed.");
                }
            }
        }
        Command::Reset { pin } => {
            require_configured(&session)?;
            unlock_with_pin(&mut session, &pin).await?;
            session.reset().await?;
            println!("All data erased.");
        }
        Command::Theme { action } => {
            match action {
                ThemeAction::Toggle => {
                    let theme = session.toggle_theme().await;
                    println!("Theme: {}", theme);
                }
                ThemeAction::Auto { state } => {
                    let enabled = matches!(state, Switch::On);
                    session.set_auto_theme(enabled).await;
                    println!("Auto theme {}", if enabled { "on" } else { "off" });
                }
            }
        }
    }

    Ok(())
}

fn require_configured(session: &AppSession) -> anyhow::Result<()> {
    if session.status() == LockStatus::NotSetup {
        bail!("App not set up yet, run `aura setup` first");
    }
    Ok(())
}

/// Unlock by PIN alone, without the biometric prompt.
async fn unlock_with_pin(session: &mut AppSession, pin: &str) -> anyhow::Result<()> {
    if !is_valid_pin(pin) {
        bail!("PIN must have {} digits", PIN_LENGTH);
    }
    let guard = session.guard_mut();
    guard.expire_lockout_if_due().await;
    if guard.state() == GuardState::Locked {
        bail!("Too many attempts. Try again in {}s", guard.time_left());
    }
    guard.choose_pin();

    match guard.enter_pin(pin).await {
        GuardOutcome::Unlocked => Ok(()),
        GuardOutcome::Rejected { remaining, .. } => {
            bail!("Incorrect PIN ({} attempts left)", remaining)
        }
        GuardOutcome::LockedOut { seconds_left, .. } => {
            bail!("Too many attempts. Try again in {}s", seconds_left)
        }
        outcome => bail!("PIN not accepted ({:?})", outcome),
    }
}

fn describe(outcome: &GuardOutcome) -> Option<String> {
    let text = match outcome {
        GuardOutcome::Ignored | GuardOutcome::Unlocked => return None,
        GuardOutcome::DigitAccepted { entered } | GuardOutcome::DigitRemoved { entered } => {
            let entered = (*entered).min(PIN_LENGTH);
            format!("{}{}", "●".repeat(entered), "○".repeat(PIN_LENGTH - entered))
        }
        GuardOutcome::Rejected { remaining, .. } => {
            format!("Incorrect PIN ({} attempts left)", remaining)
        }
        GuardOutcome::ModeChanged(AuthMode::Pin) => "Enter your PIN".to_string(),
        GuardOutcome::ModeChanged(AuthMode::Biometric) => "Touch the sensor".to_string(),
        GuardOutcome::LockedOut { seconds_left, .. } | GuardOutcome::Countdown { seconds_left } => {
            format!("Too many attempts. Try again in {}s", seconds_left)
        }
        GuardOutcome::LockoutExpired => "You can try again".to_string(),
    };
    Some(text)
}

/// Interactive keypad. Digits are typed, `<` deletes, `b` switches to the
/// sensor, `q` quits. Returns whether the session ended unlocked.
async fn run_keypad(session: &mut AppSession) -> Result<bool> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let guard = session.guard_mut();

    loop {
        let outcome = match guard.state() {
            GuardState::Unlocked => return Ok(true),
            GuardState::Locked => match guard.next_tick().await {
                Some(outcome) => outcome,
                None => return Ok(false),
            },
            GuardState::Biometric => {
                println!("Checking biometrics...");
                guard.authenticate_biometric().await
            }
            GuardState::PinEntry => {
                let Some(line) = lines.next_line().await? else {
                    return Ok(false);
                };
                let mut last = GuardOutcome::Ignored;
                for key in line.trim().chars() {
                    last = match key {
                        'q' => return Ok(false),
                        '<' => guard.backspace(),
                        'b' => guard.choose_biometric().await,
                        digit => guard.press_digit(digit).await,
                    };
                    if guard.state() != GuardState::PinEntry {
                        break;
                    }
                }
                last
            }
        };

        if let Some(text) = describe(&outcome) {
            println!("{}", text);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_parse() {
        let args = Args::try_parse_from([
            "aura",
            "--data-dir",
            "/tmp/aura",
            "--no-recovery-pin",
            "setup",
            "--salary",
            "4200.50",
            "--pin",
            "4321",
        ])
        .unwrap();
        assert_eq!(args.data_dir, PathBuf::from("/tmp/aura"));
        assert_eq!(args.guard_config().recovery_pin, None);
        assert!(matches!(
            args.command,
            Command::Setup { salary, ref pin } if salary == 4200.50 && pin == "4321"
        ));
    }

    #[test]
    fn test_theme_auto_parse() {
        let args = Args::try_parse_from(["aura", "theme", "auto", "off"]).unwrap();
        assert!(matches!(
            args.command,
            Command::Theme {
                action: ThemeAction::Auto { state: Switch::Off }
            }
        ));
        assert_eq!(args.data_dir, PathBuf::from(".aura"));
        assert!(args.guard_config().recovery_pin.is_some());
    }

    #[test]
    fn test_describe_outcomes() {
        assert_eq!(
            describe(&GuardOutcome::DigitAccepted { entered: 2 }).as_deref(),
            Some("●●○○")
        );
        assert_eq!(
            describe(&GuardOutcome::Countdown { seconds_left: 12 }).as_deref(),
            Some("Too many attempts. Try again in 12s")
        );
        assert_eq!(describe(&GuardOutcome::Ignored), None);
    }

    #[tokio::test]
    async fn test_execute_setup_and_theme_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let data_dir = dir.path().to_str().unwrap();

        let setup = Args::try_parse_from([
            "aura", "--data-dir", data_dir, "setup", "--salary", "3000", "--pin", "4321",
        ])
        .unwrap();
        execute(setup).await.unwrap();

        let toggle = Args::try_parse_from(["aura", "--data-dir", data_dir, "theme", "toggle"]).unwrap();
        execute(toggle).await.unwrap();

        let session = AppSession::open_in(
            dir.path(),
            Arc::new(SimulatedBiometric::unavailable()),
            GuardConfig::default(),
        )
        .await
        .unwrap();
        assert_eq!(session.status(), LockStatus::Locked);
        assert_eq!(session.preferences().salary, Some(3000.0));
        assert_eq!(
            session.preferences().theme,
            Some(crate::storage::Theme::Emerald)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_wrong_pin_reports_remaining_attempts() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = AppSession::open_in(
            dir.path(),
            Arc::new(SimulatedBiometric::unavailable()),
            GuardConfig::default(),
        )
        .await
        .unwrap();
        session.setup(3000.0, "4321").await.unwrap();
        session.lock().await;

        for bad in ["43219999", "4321xyz", "12"] {
            let err = unlock_with_pin(&mut session, bad).await.unwrap_err();
            assert_eq!(err.to_string(), "PIN must have 4 digits");
        }
        assert_eq!(session.guard().attempts(), 0);
        assert_eq!(session.guard().entered_digits(), 0);
        assert_eq!(session.status(), LockStatus::Locked);

        let err = unlock_with_pin(&mut session, "0000").await.unwrap_err();
        assert_eq!(err.to_string(), "Incorrect PIN (2 attempts left)");
        unlock_with_pin(&mut session, "4321").await.unwrap();
        assert_eq!(session.status(), LockStatus::Unlocked);
    }
}

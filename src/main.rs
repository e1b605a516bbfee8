//! Wager Ledger - concurrent settlement simulation
//!
//! Drives the wallet the way a busy community would: many members placing
//! and resolving bets at the same time.
//!
//! ```text
//! ┌──────────┐    ┌──────────┐    ┌──────────┐    ┌──────────┐
//! │  Config  │───▶│ Snapshot │───▶│  Wagers  │───▶│  Output  │
//! │  (YAML)  │    │ (restore)│    │ (N thr.) │    │(CSV+JSON)│
//! └──────────┘    └──────────┘    └──────────┘    └──────────┘
//! ```

use std::fs::{self, File};
use std::io::BufWriter;
use std::path::Path;
use std::time::Instant;

use anyhow::{Context, Result, bail};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{error, info, warn};

use wager_ledger::config::AppConfig;
use wager_ledger::ledger::{self, LedgerWriter};
use wager_ledger::logging::init_logging;
use wager_ledger::snapshot;
use wager_ledger::{Outcome, UserId, WalletService};

// ============================================================
// ARGUMENTS
// ============================================================

fn arg_value(names: &[&str]) -> Option<String> {
    let args: Vec<String> = std::env::args().collect();
    for i in 0..args.len() {
        if names.contains(&args[i].as_str()) && i + 1 < args.len() {
            return Some(args[i + 1].clone());
        }
    }
    None
}

fn get_env() -> String {
    arg_value(&["--env", "-e"]).unwrap_or_else(|| "dev".to_string())
}

fn get_number(name: &str, default: u64) -> Result<u64> {
    match arg_value(&[name]) {
        Some(v) => v
            .parse()
            .with_context(|| format!("{name} expects a number, got {v}")),
        None => Ok(default),
    }
}

fn get_output_dir() -> String {
    arg_value(&["--output"]).unwrap_or_else(|| "output".to_string())
}

// ============================================================
// SIMULATION
// ============================================================

#[derive(Debug, Default, Clone, Copy)]
struct Tally {
    wins: u64,
    losses: u64,
    refunds: u64,
    errors: u64,
}

impl Tally {
    fn merge(self, other: Tally) -> Tally {
        Tally {
            wins: self.wins + other.wins,
            losses: self.losses + other.losses,
            refunds: self.refunds + other.refunds,
            errors: self.errors + other.errors,
        }
    }
}

/// One member's session. Every tenth guess is malformed on purpose to
/// exercise the refund path.
fn play_session(service: &WalletService, user_id: UserId, rounds: u64, seed: u64) -> Tally {
    let mut rng = StdRng::seed_from_u64(seed ^ user_id.rotate_left(17));
    let mut tally = Tally::default();

    for round in 0..rounds {
        let stake = rng.gen_range(1..=10);
        let (game, guess) = if rng.gen_bool(0.5) {
            let face: u32 = rng.gen_range(1..=6);
            ("dice", face.to_string())
        } else {
            let call = if rng.gen_bool(0.5) { "heads" } else { "tails" };
            ("coin", call.to_string())
        };
        let guess = if round % 10 == 9 { "?".to_string() } else { guess };

        match service.play(user_id, stake, game, &guess, &mut rng) {
            Ok(report) => match report.settlement.outcome {
                Outcome::Win => tally.wins += 1,
                Outcome::Lose => tally.losses += 1,
                Outcome::Invalid => tally.refunds += 1,
            },
            Err(e) => {
                warn!(user_id, error = %e, code = e.code(), "Wager rejected");
                tally.errors += 1;
            }
        }
    }
    tally
}

fn main() -> Result<()> {
    let env = get_env();
    let app_config = AppConfig::load(&env)?;
    let _log_guard = init_logging(&app_config)?;

    let users = get_number("--users", 16)?;
    let rounds = get_number("--rounds", 1_000)?;
    let seed = get_number("--seed", 42)?;
    let output_dir = get_output_dir();

    info!(
        version = env!("CARGO_PKG_VERSION"),
        env = %env,
        users,
        rounds,
        seed,
        "Starting wager ledger simulation"
    );

    let service = WalletService::new(app_config.wallet.clone());
    let persistence = &app_config.persistence;

    // 1. Restore
    if persistence.enabled
        && let Some(saved) = snapshot::load(&persistence.snapshot_path)?
    {
        service.restore(&saved)?;
    }

    // 2. Seed members
    let names: Vec<(UserId, String)> = (1..=users).map(|id| (id, format!("member-{id}"))).collect();
    let created = service.ensure_members(names.iter().map(|(id, n)| (*id, n.as_str())));
    info!(created, total = service.store().len(), "Members ready");

    // 3. Play concurrently
    let start = Instant::now();
    let tally = std::thread::scope(|s| {
        let handles: Vec<_> = (1..=users)
            .map(|user_id| {
                let service = &service;
                s.spawn(move || play_session(service, user_id, rounds, seed))
            })
            .collect();
        handles
            .into_iter()
            .map(|h| h.join().unwrap_or_default())
            .fold(Tally::default(), Tally::merge)
    });
    let elapsed = start.elapsed();
    let settled = tally.wins + tally.losses + tally.refunds;
    info!(
        wins = tally.wins,
        losses = tally.losses,
        refunds = tally.refunds,
        errors = tally.errors,
        elapsed_ms = elapsed.as_millis() as u64,
        bets_per_sec = (settled as f64 / elapsed.as_secs_f64().max(1e-9)) as u64,
        "Simulation complete"
    );

    // 4. Verify conservation against the journal
    fs::create_dir_all(&output_dir).with_context(|| format!("Failed to create {output_dir}"))?;
    let accounts = service.store().accounts();

    if let Some(audit) = service.audit() {
        let entries = audit.drain();
        let net = ledger::net_deltas(&entries);
        let mut mismatches = 0;
        for account in &accounts {
            let journaled = net.get(&account.user_id).copied().unwrap_or_default();
            if journaled != i128::from(account.balance) {
                error!(
                    user_id = account.user_id,
                    balance = account.balance,
                    journaled = %journaled,
                    "Journal does not match balance"
                );
                mismatches += 1;
            }
        }

        let journal_path = Path::new(&persistence.journal_path);
        if let Some(dir) = journal_path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create journal dir {}", dir.display()))?;
        }
        let mut writer = LedgerWriter::create(journal_path)
            .with_context(|| format!("Failed to create {}", journal_path.display()))?;
        for entry in &entries {
            writer.write_entry(entry)?;
        }
        writer.flush()?;
        info!(entries = writer.entry_count(), "Ledger journal written");

        if mismatches > 0 {
            bail!("{mismatches} accounts failed conservation check");
        }
        info!(accounts = accounts.len(), "Conservation check passed");
    }

    // 5. Dump balances
    let balances_path = format!("{output_dir}/balances.csv");
    let file = File::create(&balances_path)
        .with_context(|| format!("Failed to create {balances_path}"))?;
    ledger::dump_balances(&accounts, BufWriter::new(file))?;
    info!(path = %balances_path, "Balances written");

    // 6. Save
    if persistence.enabled {
        snapshot::save(service.store(), &persistence.snapshot_path)?;
        info!(path = %persistence.snapshot_path, "Snapshot saved");
    }

    Ok(())
}

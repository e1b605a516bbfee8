use std::thread;

use rand::SeedableRng;
use rand::rngs::StdRng;

use wager_ledger::config::WalletConfig;
use wager_ledger::ledger::net_deltas;
use wager_ledger::snapshot;
use wager_ledger::{LedgerError, LedgerOp, Outcome, UserId, WalletService};

fn service() -> WalletService {
    WalletService::new(WalletConfig::default())
}

/// Helper: seed `count` members named member-<id>
fn seed_members(svc: &WalletService, count: u64) {
    let names: Vec<(UserId, String)> = (1..=count).map(|id| (id, format!("member-{id}"))).collect();
    let created = svc.ensure_members(names.iter().map(|(id, n)| (*id, n.as_str())));
    assert_eq!(created as u64, count);
}

#[test]
fn concurrent_players_conserve_value() {
    let svc = service();
    seed_members(&svc, 8);

    // Each thread returns the sum of its settlement nets
    let nets: Vec<(UserId, i64)> = thread::scope(|s| {
        let handles: Vec<_> = (1..=8u64)
            .map(|user_id| {
                let svc = &svc;
                s.spawn(move || {
                    let mut rng = StdRng::seed_from_u64(user_id * 7919);
                    let mut net = 0i64;
                    for round in 0..200u64 {
                        let (game, guess) = match round % 3 {
                            0 => ("dice", "4"),
                            1 => ("coin", "heads"),
                            _ => ("dice", "seven"),
                        };
                        let report = svc.play(user_id, 5, game, guess, &mut rng).unwrap();
                        net += report.settlement.net();
                    }
                    (user_id, net)
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    for (user_id, net) in nets {
        let account = svc.account(user_id).unwrap();
        assert_eq!(account.balance, 100 + net, "user {user_id}");
        assert!(account.pending_bet.is_none());
    }

    // The journal alone reproduces every balance
    let entries = svc.audit().unwrap().drain();
    let journaled = net_deltas(&entries);
    for account in svc.store().accounts() {
        assert_eq!(journaled[&account.user_id], i128::from(account.balance));
    }
}

#[test]
fn malformed_guess_refunds_stake() {
    let svc = service();
    svc.ensure_account(1, "alice");
    let mut rng = StdRng::seed_from_u64(3);

    let report = svc.play(1, 30, "dice", "edge", &mut rng).unwrap();
    assert_eq!(report.settlement.outcome, Outcome::Invalid);
    assert_eq!(report.settlement.credited, 30);
    assert_eq!(
        report.refund_reason,
        Some(LedgerError::InvalidGuess("edge".into()))
    );
    assert_eq!(svc.get_balance(1).unwrap(), 100);
}

#[test]
fn admin_and_wagers_interleave_without_lost_updates() {
    let svc = service();
    svc.ensure_account(1, "alice");

    thread::scope(|s| {
        // Admin tops up 400 times by 3
        s.spawn(|| {
            for _ in 0..400 {
                svc.admin_deposit(1, 3).unwrap();
            }
        });
        // Player loses 200 bets of 2, retrying while another bet is open
        s.spawn(|| {
            let mut placed = 0;
            while placed < 200 {
                match svc.place_bet(1, 2) {
                    Ok(_) => {
                        svc.resolve(1, Outcome::Lose).unwrap();
                        placed += 1;
                    }
                    Err(LedgerError::BetAlreadyPending(_)) => thread::yield_now(),
                    Err(e) => panic!("unexpected error {e}"),
                }
            }
        });
    });

    assert_eq!(svc.get_balance(1).unwrap(), 100 + 400 * 3 - 200 * 2);

    let entries = svc.audit().unwrap().drain();
    let escrows = entries.iter().filter(|e| e.op == LedgerOp::Escrow).count();
    let forfeits = entries.iter().filter(|e| e.op == LedgerOp::Forfeit).count();
    assert_eq!(escrows, 200);
    assert_eq!(forfeits, 0, "a lost bet moves no money at resolution");
}

#[test]
fn lifecycle_errors_leave_balance_untouched() {
    let svc = service();
    svc.ensure_account(1, "alice");

    assert_eq!(
        svc.resolve(1, Outcome::Win),
        Err(LedgerError::NoPendingBet(1))
    );
    assert_eq!(svc.place_bet(1, 0), Err(LedgerError::InvalidAmount(0)));
    assert_eq!(svc.place_bet(1, -5), Err(LedgerError::InvalidAmount(-5)));

    svc.place_bet(1, 10).unwrap();
    assert_eq!(svc.place_bet(1, 10), Err(LedgerError::BetAlreadyPending(1)));
    assert_eq!(svc.resolve(1, Outcome::Win), Err(LedgerError::OddsNotSet(1)));
    assert_eq!(svc.get_balance(1).unwrap(), 90);

    assert_eq!(svc.resolve(1, Outcome::Invalid).unwrap(), 100);
}

#[test]
fn bets_may_drive_balance_into_debt() {
    let svc = service();
    svc.ensure_account(1, "alice");

    svc.place_bet(1, 250).unwrap();
    assert_eq!(svc.resolve(1, Outcome::Lose).unwrap(), -150);
    assert_eq!(svc.wipe_debt(1).unwrap(), 100);
}

#[test]
fn snapshot_survives_restart() {
    let path = std::env::temp_dir().join(format!("wallets_{}.json", uuid::Uuid::new_v4()));

    let before = service();
    seed_members(&before, 3);
    before.admin_deposit(1, 40).unwrap();
    before.admin_spend(2, 160).unwrap();
    before.place_bet(3, 25).unwrap();
    snapshot::save(before.store(), &path).unwrap();

    let after = service();
    let saved = snapshot::load(&path).unwrap().unwrap();
    assert_eq!(saved.restore_into(after.store()).unwrap(), 3);

    assert_eq!(after.get_balance(1).unwrap(), 140);
    assert_eq!(after.get_balance(2).unwrap(), -60);
    // The open bet comes back as refunded
    assert_eq!(after.get_balance(3).unwrap(), 100);
    assert!(after.account(3).unwrap().pending_bet.is_none());
    assert_eq!(after.account(2).unwrap().display_name, "member-2");

    // A restored member is not re-seeded with the starting balance
    assert_eq!(after.ensure_account(2, "member-2"), -60);

    std::fs::remove_file(&path).unwrap();
}

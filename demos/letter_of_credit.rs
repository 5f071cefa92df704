//! Walk a letter of credit from issue to settlement against a sled world state.
//!
//! Run with an optional config path:
//! `cargo run --example letter_of_credit -- config/ledger.yaml`

use anyhow::Context;
use papernet::{
    Contract, Record, SledWorldState,
    config::LedgerConfig,
    logging::init_logging,
};

fn main() -> anyhow::Result<()> {
    let config = match std::env::args().nth(1) {
        Some(path) => LedgerConfig::load(path)?,
        None => {
            let mut config = LedgerConfig::default();
            config.storage.temporary = true;
            config
        }
    };
    init_logging(&config.logging)?;

    let world_state = SledWorldState::open(&config.storage).context("opening world state")?;
    let contract = Contract::letter_of_credit();

    let steps: [(&str, &str, &[&str]); 7] = [
        ("BankA", "issue", &["BankA", "00001", "2020-05-31", "5000"]),
        ("BankA", "approve", &["BankA", "00001", "BankA", "2020-06-01"]),
        ("BankA", "confirm", &["BankA", "00001", "BankA", "2020-06-02"]),
        (
            "BankA",
            "addShipping",
            &["BankA", "00001", "BankA", "Exporter", "BL-7781", "2020-06-10"],
        ),
        (
            "Exporter",
            "confirmShipping",
            &["BankA", "00001", "Exporter", "AdvisingBank", "2020-06-12"],
        ),
        (
            "AdvisingBank",
            "fund",
            &["BankA", "00001", "AdvisingBank", "IssuingBank", "5000", "2020-06-15"],
        ),
        (
            "IssuingBank",
            "pay",
            &["BankA", "00001", "IssuingBank", "BankA", "5000", "2020-06-20"],
        ),
    ];

    for (caller, operation, args) in steps {
        let mut tx = world_state.begin(caller)?;
        let bytes = contract
            .invoke(&mut tx, operation, args)
            .with_context(|| format!("{operation} failed"))?;
        tx.commit()?;

        let record = Record::deserialize(&bytes, contract.kind())?;
        println!(
            "{operation:>16} -> {:<20} owner {}",
            record.state(),
            record.owner().unwrap_or_default()
        );
    }

    let mut tx = world_state.begin("Auditor")?;
    for record in contract.list(&mut tx)? {
        println!("{}: {:?}", record.key()?, record.attributes());
    }

    world_state.flush()?;
    Ok(())
}

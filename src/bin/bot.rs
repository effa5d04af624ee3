//! Console REPL for driving the dialog engine interactively.
//!
//! Loads the demo banking vocabulary and routes from `data/`, wires up the
//! default language backends, and reads utterances from stdin. Replies are
//! printed by the pacing delivery task, so multi-part answers arrive with
//! the same rhythm a chat user would see.
//!
//! `SLOTFLOW_CONFIG` may point at a YAML [`EngineConfig`] file; without it
//! the defaults apply. `SLOTFLOW_DEBUG=1` appends a state line to every
//! reply. `/reset` starts the session over, `/quit` exits.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::io::{AsyncBufReadExt, BufReader};

use slotflow::nlu::{CaseFoldTagger, HashingEmbedder, RegexTokenizer};
use slotflow::policy::ActionError;
use slotflow::runtime::ConsoleTransport;
use slotflow::slots::KeywordClassifier;
use slotflow::{
    read_routes, read_slot_table, validate_slots, ActionHandler, DialogEngine, EngineConfig,
    FeaturePipeline, Phrasebook, SlotClassRegistry, TurnPipeline,
};

const USER: &str = "console";

/// Demo domain actions answering the routes in `data/routes.json`.
///
/// The walk re-runs `start_account_opening` on the turn that answers the
/// notification question, so the handler remembers which applications it
/// already opened and acknowledges repeats with one short line.
#[derive(Default)]
struct DemoActions {
    opened: Mutex<HashSet<(String, String)>>,
}

fn slot_value<'a>(slots: &'a [(String, String)], id: &str) -> &'a str {
    slots
        .iter()
        .find(|(slot, _)| slot == id)
        .map(|(_, value)| value.as_str())
        .unwrap_or("?")
}

#[async_trait]
impl ActionHandler for DemoActions {
    async fn run(
        &self,
        action_id: &str,
        slots: &[(String, String)],
    ) -> Result<Vec<String>, ActionError> {
        match action_id {
            "start_account_opening" => {
                let account_type = slot_value(slots, "account_type");
                let currency = slot_value(slots, "currency");
                let fresh = self
                    .opened
                    .lock()
                    .insert((account_type.to_string(), currency.to_string()));
                if fresh {
                    Ok(vec![
                        format!("Заявка на счет ({account_type}, {currency}) создана."),
                        "Менеджер свяжется с вами в течение часа.".to_string(),
                    ])
                } else {
                    Ok(vec!["Заявка уже в работе.".to_string()])
                }
            }
            "enable_notifications" => Ok(vec!["Уведомления об операциях подключены.".to_string()]),
            "show_exchange_rate" => {
                let rate = match slot_value(slots, "currency") {
                    "EUR" => "92.40",
                    "USD" => "84.15",
                    "RUB" => "1.00",
                    _ => return Err(ActionError::Failed("unknown currency".to_string())),
                };
                Ok(vec![format!(
                    "Курс {} на сегодня: {} руб.",
                    slot_value(slots, "currency"),
                    rate
                )])
            }
            "show_nearest_branch" => Ok(vec![format!(
                "Ближайшее отделение к станции {}: работает ежедневно с 9 до 20.",
                slot_value(slots, "client_metro")
            )]),
            other => Err(ActionError::UnknownAction(other.to_string())),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mut config = match std::env::var("SLOTFLOW_CONFIG") {
        Ok(path) => EngineConfig::from_yaml_file(&path)
            .with_context(|| format!("loading config from {path}"))?,
        Err(_) => EngineConfig::default(),
    };
    if std::env::var("SLOTFLOW_DEBUG").as_deref() == Ok("1") {
        config.debug = true;
    }

    let slot_path = config
        .slot_table
        .clone()
        .unwrap_or_else(|| PathBuf::from("data/slots.tsv"));
    let definitions = read_slot_table(&slot_path)
        .with_context(|| format!("loading slot table {}", slot_path.display()))?;
    let slots = SlotClassRegistry::with_defaults()
        .build_all(&definitions)
        .context("building slots")?;

    let route_path = config
        .routes
        .clone()
        .unwrap_or_else(|| PathBuf::from("data/routes.json"));
    let graphs =
        read_routes(&route_path).with_context(|| format!("loading routes {}", route_path.display()))?;
    let known: HashSet<String> = slots.iter().map(|s| s.id.clone()).collect();
    validate_slots(&graphs, &known).context("validating routes against the slot table")?;

    let phrases = match &config.phrases {
        Some(path) => Arc::new(
            Phrasebook::from_file(path)
                .with_context(|| format!("loading phrases {}", path.display()))?,
        ),
        None => Arc::new(Phrasebook::embedded()),
    };

    let pipeline = Arc::new(FeaturePipeline::with_default_stages(
        Arc::new(RegexTokenizer::new()),
        Arc::new(CaseFoldTagger::new()),
        Arc::new(HashingEmbedder::default()),
    ));

    let intents = Arc::new(
        KeywordClassifier::new()
            .with_label(
                "open_account",
                &["счет", "счёт", "открыть", "завести", "вклад"],
            )
            .with_label("exchange_rate", &["курс", "обмен", "обменять"])
            .with_label("find_branch", &["отделение", "офис", "филиал", "банкомат"]),
    );
    for label in intents.labels() {
        if !graphs.contains_key(label) {
            bail!("intent {label} has no route in {}", route_path.display());
        }
    }

    let engine = Arc::new(
        DialogEngine::new(
            pipeline,
            slots,
            intents,
            graphs,
            Arc::new(DemoActions::default()),
            phrases,
        )
        .with_debug(config.debug),
    );
    let turns = TurnPipeline::new(engine, Arc::new(ConsoleTransport::new()), config);

    println!(
        "slotflow {} console. /reset начинает заново, /quit выходит.",
        slotflow::VERSION
    );
    turns.greet(USER).await;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        match line.trim() {
            "" => continue,
            "/quit" | "/exit" => break,
            "/reset" => {
                turns.remove_session(USER);
                turns.greet(USER).await;
            }
            "/start" => turns.greet(USER).await,
            text => turns.submit(USER, text).await,
        }
    }

    turns.shutdown().await;
    Ok(())
}

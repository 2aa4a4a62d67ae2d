//! `jtrade`: runs one engine role (MD, TD, or CP) as a standalone process,
//! joining the shared-memory journal bus at the locations its `--cfg` names
//! (spec §6.2, §6.4).

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use dotenv::dotenv;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use jtrade_core::bootstrap::{AccountConfig, Config, FdsMap};
use jtrade_core::engine;
use jtrade_core::engine::cp::CpEngine;
use jtrade_core::engine::md::{DataService, MdEngine};
use jtrade_core::engine::td::{TdEngine, TradeService};
use jtrade_core::executor::Executor;
use jtrade_core::ids::{hash_account_dest, hash_role_tag, RoleTag};
use jtrade_core::journal::Writer;
use jtrade_core::location::{Locator, Location};
use jtrade_core::model::trading::{AccountReq, OrderCancel, OrderInput};
use jtrade_core::model::{Asset, AssetMargin, Bar, BrokerState, Deregister, Entrust, Order, PositionBook, Quote, Transaction, Trade};
use jtrade_core::observer::eventfd::EventFd;
use jtrade_core::strategy::Strategy;

#[derive(Parser)]
#[command(name = "jtrade")]
struct Cli {
    /// Which engine role this process hosts.
    #[arg(long, value_enum)]
    role: Role,

    /// Path to the JSON configuration (spec §6.2), also settable via `JTRADE_CFG`.
    #[arg(long, env = "JTRADE_CFG")]
    cfg: PathBuf,
}

#[derive(Clone, Copy, ValueEnum)]
enum Role {
    Md,
    Td,
    Cp,
}

fn main() -> Result<()> {
    load_env();
    init_tracing();

    let cli = Cli::parse();
    let cfg = Config::load(&cli.cfg).with_context(|| format!("loading config {}", cli.cfg.display()))?;
    cfg.validate().context("invalid configuration")?;

    let locator = Locator::new(cfg.system.output_root_path.clone());
    let fds = load_fds(&cfg);

    let code = match cli.role {
        Role::Md => run_md(locator, &cfg, fds)?,
        Role::Td => run_td(locator, &cfg, fds)?,
        Role::Cp => run_cp(locator, &cfg, fds)?,
    };
    std::process::exit(code);
}

/// A published wakeup descriptor if the bootstrap supervisor set one up for
/// this stream, otherwise a fresh in-process counter — lets a single engine
/// run standalone (tests, local dev) without a supervisor (spec §6.2).
fn writer_wakeup(fds: &FdsMap, location: &Location, dest_id: u32) -> std::io::Result<EventFd> {
    let key = format!("{}_{dest_id}", location.uid);
    match fds.get(&key) {
        Some(fd) => Ok(EventFd::borrowed(fd)),
        None => {
            warn!(key, "no published wakeup descriptor, minting a local one");
            EventFd::create()
        }
    }
}

fn load_fds(cfg: &Config) -> FdsMap {
    if std::env::var("FDS").is_ok() {
        return FdsMap::from_env();
    }
    match &cfg.system.fds_fallback_path {
        Some(path) => FdsMap::from_fallback_file(path).unwrap_or_else(|e| {
            warn!(error = %e, "failed to load descriptor fallback file, running without published wakeups");
            FdsMap::default()
        }),
        None => FdsMap::default(),
    }
}

fn run_md(locator: Locator, cfg: &Config, fds: FdsMap) -> Result<i32> {
    let location = engine::md_location(cfg.system.mode);
    let mut eng = MdEngine::new(locator.clone(), location.clone(), fds.clone())?;
    for AccountConfig { institution, account } in &cfg.md {
        let dest = hash_account_dest(institution, account);
        let wakeup = writer_wakeup(&fds, &location, dest)?;
        let writer = Writer::open(locator.clone(), location.clone(), dest, false, Some(wakeup))?;
        eng.register_account(institution, account, writer, Box::new(LoggingDataService));
        info!(institution, account, "md engine registered account");
    }
    Ok(jtrade_core::reactor::run(&mut eng))
}

fn run_td(locator: Locator, cfg: &Config, fds: FdsMap) -> Result<i32> {
    let location = engine::td_location(cfg.system.mode);
    let response_dest = hash_role_tag(RoleTag::TdResponse);
    let response_wakeup = writer_wakeup(&fds, &location, response_dest)?;
    let response_writer = Writer::open(locator.clone(), location.clone(), response_dest, false, Some(response_wakeup))?;
    let mut eng = TdEngine::new(locator, location, response_writer, fds)?;
    for AccountConfig { institution, account } in &cfg.td {
        eng.register_account(institution, account, Box::new(LoggingTradeService));
        info!(institution, account, "td engine registered account");
    }
    Ok(jtrade_core::reactor::run(&mut eng))
}

fn run_cp(locator: Locator, cfg: &Config, fds: FdsMap) -> Result<i32> {
    let cp_location = engine::cp_location(cfg.system.mode);
    let md_req_dest = hash_role_tag(RoleTag::MdReq);
    let md_req_wakeup = writer_wakeup(&fds, &cp_location, md_req_dest)?;
    let md_req_writer = Writer::open(locator.clone(), cp_location.clone(), md_req_dest, false, Some(md_req_wakeup))?;

    let td_location = engine::td_location(cfg.system.mode);
    let mut executor = Executor::new(md_req_writer, td_location.uid)?;
    for AccountConfig { institution, account } in &cfg.td {
        let dest = hash_account_dest(institution, account);
        let wakeup = writer_wakeup(&fds, &td_location, dest)?;
        let writer = Writer::open(locator.clone(), td_location.clone(), dest, false, Some(wakeup))?;
        executor.register_account(institution, account, writer);
    }

    let md_accounts: Vec<(String, String)> = cfg.md.iter().map(|a| (a.institution.clone(), a.account.clone())).collect();
    let strategy: Box<dyn Strategy> = Box::new(LoggingStrategy);
    let mut eng = CpEngine::new(locator, cfg.system.mode, &md_accounts, executor, strategy, fds)?;
    Ok(jtrade_core::reactor::run(&mut eng))
}

/// Logs every callback instead of talking to a broker feed. Swap in a real
/// adapter to go live (spec's broker adapters are explicitly out of scope).
struct LoggingDataService;

impl DataService for LoggingDataService {
    fn start(&mut self, begin_time: i64) {
        info!(begin_time, "md data service started");
    }

    fn on_subscribe(&mut self, instruments: &[jtrade_core::model::InstrumentKey]) {
        info!(count = instruments.len(), "md data service subscribed");
    }
}

/// Logs every order request instead of talking to a broker's trading gateway.
struct LoggingTradeService;

impl TradeService for LoggingTradeService {
    fn start(&mut self) {
        info!("td trade service started");
    }

    fn insert_order(&mut self, input: &OrderInput) {
        info!(order_id = input.order_id, volume = input.volume, "td trade service received order");
    }

    fn cancel_order(&mut self, cancel: &OrderCancel) {
        info!(order_id = cancel.order_id, "td trade service received cancel");
    }

    fn req_account_info(&mut self, req: &AccountReq) {
        info!(institution = req.institution.as_str(), account = req.account.as_str(), "td trade service account info requested");
    }
}

/// Logs every strategy callback. Swap in a real strategy to trade.
struct LoggingStrategy;

impl Strategy for LoggingStrategy {
    fn pre_start(&mut self, _executor: &mut Executor) {
        info!("cp strategy starting");
    }

    fn on_trading_day(&mut self, _executor: &mut Executor, trading_day: u32) {
        info!(trading_day, "cp strategy observed trading day");
    }

    fn on_bar(&mut self, _executor: &mut Executor, source: u32, bar: &Bar) {
        info!(source, close = bar.close, "cp strategy observed bar");
    }

    fn on_quote(&mut self, _executor: &mut Executor, source: u32, quote: &Quote) {
        let (_, _) = (source, quote);
    }

    fn on_entrust(&mut self, _executor: &mut Executor, source: u32, entrust: &Entrust) {
        let (_, _) = (source, entrust);
    }

    fn on_transaction(&mut self, _executor: &mut Executor, source: u32, transaction: &Transaction) {
        let (_, _) = (source, transaction);
    }

    fn on_order(&mut self, _executor: &mut Executor, order: &Order) {
        info!(order_id = order.order_id, status = ?order.status, "cp strategy observed order");
    }

    fn on_trade(&mut self, _executor: &mut Executor, trade: &Trade) {
        info!(trade_id = trade.trade_id, volume = trade.volume, "cp strategy observed trade");
    }

    fn on_asset(&mut self, _executor: &mut Executor, _old: Option<Asset>, new: Asset) {
        info!(avail = new.avail, "cp strategy observed asset update");
    }

    fn on_asset_margin(&mut self, _executor: &mut Executor, _old: Option<AssetMargin>, new: AssetMargin) {
        info!(margin = new.margin, "cp strategy observed asset margin update");
    }

    fn on_position_book(&mut self, _executor: &mut Executor, book: &PositionBook) {
        info!(long = book.long.len(), short = book.short.len(), "cp strategy observed position book sync");
    }

    fn on_broker_state(&mut self, _executor: &mut Executor, institution: &str, account: &str, state: BrokerState) {
        info!(institution, account, ?state, "cp strategy observed broker state");
    }

    fn on_deregister(&mut self, _executor: &mut Executor, deregister: &Deregister) {
        info!(institution = deregister.institution.as_str(), account = deregister.account.as_str(), "cp strategy observed deregister");
    }

    fn on_timer(&mut self, _executor: &mut Executor, timer_id: u32) {
        info!(timer_id, "cp strategy timer fired");
    }

    fn on_custom_data(&mut self, _executor: &mut Executor, msg_type: i32, payload: &[u8]) {
        info!(msg_type, len = payload.len(), "cp strategy observed custom data");
    }
}

/// Initialize tracing with the `JTRADE_LOG` env filter, matching the teacher's
/// registry/fmt-layer setup.
fn init_tracing() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_env("JTRADE_LOG").unwrap_or_else(|_| "jtrade_core=info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn load_env() {
    let _ = dotenv();
}

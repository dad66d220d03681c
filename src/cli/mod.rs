//! Command-line interface for the PrepX client

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use tokio_util::sync::CancellationToken;

use crate::auth::{challenge_message, Credentials};
use crate::config::{self, Config};
use crate::dashboard::Dashboard;
use crate::environment::WalletProvider;
use crate::positions::{self, CloseOutcome, FetchOutcome};
use crate::session::{ProgressStep, StartOutcome, StartParams};
use crate::utils::types::TradingSession;
use crate::wallet::{self, RefreshOutcome};

/// Main CLI structure using clap derive
#[derive(Debug, Parser)]
#[command(name = "prepx", author, version)]
#[command(about = "Client for the PrepX trading dashboard", long_about = None)]
pub struct Cli {
    /// Path to the configuration file
    #[arg(short, long, value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,

    /// Sign-in provider: base-account, metamask or web
    #[arg(long, env = "PREPX_PROVIDER", default_value = "base-account", global = true)]
    pub provider: String,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Write a commented configuration file
    Init {
        #[arg(short, long, value_name = "FILE", default_value = "prepx.toml")]
        output: PathBuf,

        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },

    /// Load and validate the configuration
    CheckConfig,

    /// Sign in and store the bearer token
    Login {
        /// Wallet address (0x...)
        #[arg(long)]
        address: Option<String>,

        /// Message that was signed; defaults to a fresh challenge
        #[arg(long)]
        message: Option<String>,

        /// Signature over the message
        #[arg(long)]
        signature: Option<String>,

        /// Farcaster id, when signing in from a mini-app
        #[arg(long)]
        fid: Option<u64>,
    },

    /// Forget the stored token
    Logout,

    /// List the account's wallets
    Wallets,

    /// Show combined balances of the base account and trading vault
    Balances,

    /// Show open positions
    Positions,

    /// Close one position by pair index or symbol
    Close {
        /// Pair index (e.g. 0) or symbol (e.g. BTC)
        target: String,
    },

    /// Close every open position
    CloseAll,

    /// Pay the platform fee and start a trading session
    Start {
        /// Total budget in USD
        #[arg(long)]
        budget: Decimal,

        /// Profit goal in USD
        #[arg(long)]
        goal: Decimal,

        #[arg(long, default_value_t = 3)]
        max_positions: u32,

        /// Leverage (1-50); picked from the budget when omitted
        #[arg(long)]
        leverage: Option<u32>,
    },

    /// Stop the running session
    Stop,

    /// Show one session (the active one by default)
    Session {
        id: Option<String>,
    },

    /// List past and current sessions
    Sessions,

    /// Keep refreshing in the background and print a summary periodically
    Watch {
        /// Seconds between summaries
        #[arg(long, default_value_t = 20)]
        every: u64,
    },

    /// Check a deposit amount against a balance
    CheckDeposit {
        #[arg(long)]
        amount: Decimal,

        #[arg(long)]
        balance: Decimal,

        #[arg(long, default_value = "ETH")]
        token: String,
    },

    /// Check a withdrawal destination and amount
    CheckWithdraw {
        #[arg(long)]
        to: String,

        #[arg(long)]
        amount: Decimal,

        #[arg(long)]
        available: Decimal,
    },
}

impl Cli {
    fn load_config(&self) -> Result<Config> {
        let config = match &self.config {
            Some(path) => Config::from_file(path)?,
            None => Config::load()?,
        };
        Ok(config)
    }

    fn provider(&self) -> Result<WalletProvider> {
        WalletProvider::from_name(&self.provider)
            .with_context(|| format!("unknown provider '{}'", self.provider))
    }

    async fn open(&self) -> Result<Dashboard> {
        let dashboard = Dashboard::new(self.load_config()?, self.provider()?)?;
        dashboard.initialize().await?;
        Ok(dashboard)
    }

    async fn open_signed_in(&self) -> Result<Dashboard> {
        let dashboard = self.open().await?;
        if !dashboard.auth().is_signed_in() {
            bail!("Not signed in. Run `prepx login` first.");
        }
        Ok(dashboard)
    }

    /// Execute the CLI command
    pub async fn execute(self) -> Result<()> {
        match &self.command {
            Commands::Init { output, force } => self.handle_init(output, *force),
            Commands::CheckConfig => self.handle_check_config(),
            Commands::Login { address, message, signature, fid } => {
                let credentials = Credentials {
                    address: address.clone(),
                    message: message.clone(),
                    signature: signature.clone(),
                    fid: *fid,
                };
                self.handle_login(credentials).await
            }
            Commands::Logout => {
                self.open().await?.logout().await?;
                println!("Signed out");
                Ok(())
            }
            Commands::Wallets => self.handle_wallets().await,
            Commands::Balances => self.handle_balances().await,
            Commands::Positions => self.handle_positions().await,
            Commands::Close { target } => self.handle_close(target).await,
            Commands::CloseAll => self.handle_close_all().await,
            Commands::Start { budget, goal, max_positions, leverage } => {
                let params = StartParams {
                    max_budget: *budget,
                    profit_goal: *goal,
                    max_positions: *max_positions,
                    leverage: *leverage,
                };
                self.handle_start(params).await
            }
            Commands::Stop => {
                let dashboard = self.open_signed_in().await?;
                dashboard.session().stop_trading().await?;
                println!("Trading session stopped");
                Ok(())
            }
            Commands::Session { id } => self.handle_session(id.as_deref()).await,
            Commands::Sessions => {
                let dashboard = self.open_signed_in().await?;
                let sessions = dashboard.session().list_sessions().await?;
                if sessions.is_empty() {
                    println!("No sessions");
                }
                sessions.iter().for_each(print_session);
                Ok(())
            }
            Commands::Watch { every } => self.handle_watch(Duration::from_secs((*every).max(1))).await,
            Commands::CheckDeposit { amount, balance, token } => {
                let config = self.load_config()?;
                let is_eth = token.eq_ignore_ascii_case("ETH");
                let check = wallet::check_deposit(*amount, *balance, is_eth, config.trading.eth_gas_reserve);
                println!("Max allowed: {} {}", check.max_allowed.normalize(), token.to_uppercase());
                check.into_result()?;
                println!("✓ Deposit can be submitted");
                Ok(())
            }
            Commands::CheckWithdraw { to, amount, available } => {
                let check = wallet::check_withdraw(to, *amount, *available);
                check.into_result()?;
                println!("✓ Withdrawal can be submitted");
                Ok(())
            }
        }
    }

    fn handle_init(&self, output: &Path, force: bool) -> Result<()> {
        if output.exists() && !force {
            bail!("{} already exists (use --force to overwrite)", output.display());
        }
        config::generate_commented_config_template(output)?;
        println!("Generated configuration at: {}", output.display());
        Ok(())
    }

    fn handle_check_config(&self) -> Result<()> {
        let config = self.load_config()?;
        config.validate()?;
        println!("✓ Configuration is valid");
        println!("\nConfiguration summary:");
        println!("  App URL: {}", config.api.app_url);
        println!("  Network: {}", config.api.avantis_network);
        println!("  Web mode: {}", config.api.enable_web_mode);
        println!(
            "  Polling: {}s active / {}s idle / {}s session",
            config.polling.active_interval_secs, config.polling.idle_interval_secs, config.polling.session_interval_secs
        );
        println!("  Platform fee: {}%", config.trading.platform_fee_pct);
        println!("  State file: {}", config.state_path()?.display());
        Ok(())
    }

    async fn handle_login(&self, mut credentials: Credentials) -> Result<()> {
        let dashboard = self.open().await?;
        let provider = dashboard.environment().provider;
        if provider.requires_signature() && credentials.signature.is_none() {
            let address = credentials.address.as_deref().context("--address is required")?;
            let message = challenge_message(address, dashboard.environment(), Utc::now());
            println!("Sign this message with {} and pass it back with --message and --signature:\n", address);
            println!("{}", message);
            return Ok(());
        }
        if credentials.message.is_none() && credentials.signature.is_some() {
            bail!("--message is required with --signature");
        }
        credentials.address = credentials.address.map(|a| a.trim().to_string());

        let user = dashboard.auth().sign_in(credentials).await?;
        match user.and_then(|u| u.address.or(u.id)) {
            Some(who) => println!("✓ Signed in as {}", who),
            None => println!("✓ Signed in"),
        }
        Ok(())
    }

    async fn handle_wallets(&self) -> Result<()> {
        let dashboard = self.open_signed_in().await?;
        let wallets = dashboard.wallet().wallets();
        if wallets.is_empty() {
            println!("No wallets");
        }
        for wallet in [&wallets.base_account, &wallets.trading].into_iter().flatten() {
            println!(
                "{:<13} {}  {}  created {}",
                format!("{:?}", wallet.wallet_type),
                wallet.address,
                wallet.chain,
                wallet.created_at.format("%Y-%m-%d")
            );
        }
        Ok(())
    }

    async fn handle_balances(&self) -> Result<()> {
        let dashboard = self.open_signed_in().await?;
        let view = match dashboard.wallet().refresh_balances().await {
            RefreshOutcome::Refreshed(view) => view,
            RefreshOutcome::Failed(message) => bail!(message),
            RefreshOutcome::Skipped | RefreshOutcome::UpToDate => {
                dashboard.wallet().view().context("no balances available")?
            }
        };
        for holding in &view.combined.holdings {
            println!(
                "{:<8} {:>20}  ${}",
                holding.token.symbol,
                holding.balance_formatted,
                holding.value_usd.round_dp(2)
            );
        }
        println!("Total: ${}", view.total_value().round_dp(2));

        let change = dashboard.track_portfolio().await?;
        println!("Today: {:+} ({:+}%)", change.absolute.round_dp(2), change.percent);
        Ok(())
    }

    async fn handle_positions(&self) -> Result<()> {
        let dashboard = self.open_signed_in().await?;
        let snapshot = match dashboard.positions().fetch_positions(true).await {
            FetchOutcome::Fetched(snapshot) => snapshot,
            FetchOutcome::Failed(message) => bail!(message),
            FetchOutcome::Skipped(_) => dashboard.positions().snapshot().unwrap_or_default(),
        };
        if snapshot.positions.is_empty() {
            println!("No open positions");
            return Ok(());
        }
        for p in &snapshot.positions {
            println!(
                "#{:<3} {:<6} {:<5} {:>3}x  entry {}  mark {}  pnl {:+}  liq {}",
                p.pair_index,
                p.symbol.as_deref().unwrap_or("?"),
                if p.is_long() { "LONG" } else { "SHORT" },
                p.leverage.normalize(),
                p.entry_price,
                p.mark_price,
                p.pnl.round_dp(2),
                p.liquidation_price.map(|l| l.round_dp(4).to_string()).unwrap_or_else(|| "-".into())
            );
        }
        println!("Total PnL: {:+}", snapshot.total_pnl.round_dp(2));
        Ok(())
    }

    async fn handle_close(&self, target: &str) -> Result<()> {
        let pair_index = match target.parse::<u32>() {
            Ok(index) => index,
            Err(_) => positions::pair_index(target).with_context(|| format!("unknown symbol '{}'", target))?,
        };
        let dashboard = self.open_signed_in().await?;
        match dashboard.positions().close_position(pair_index).await? {
            CloseOutcome::Closed(resp) => match resp.tx_hash {
                Some(hash) => println!("✓ Closed: {}", dashboard.environment().network.explorer_tx_url(&hash)),
                None => println!("✓ Closed position on pair {}", pair_index),
            },
            CloseOutcome::AlreadyInFlight => println!("A close for pair {} is already in progress", pair_index),
        }
        Ok(())
    }

    async fn handle_close_all(&self) -> Result<()> {
        let dashboard = self.open_signed_in().await?;
        match dashboard.positions().close_all().await? {
            CloseOutcome::Closed(resp) => println!("✓ Closed {} positions", resp.closed),
            CloseOutcome::AlreadyInFlight => println!("Close-all is already in progress"),
        }
        Ok(())
    }

    async fn handle_start(&self, params: StartParams) -> Result<()> {
        params.validate()?;
        let dashboard = self.open_signed_in().await?;
        let progress = |step: ProgressStep| {
            let label = match step {
                ProgressStep::Fee => "Paying platform fee...",
                ProgressStep::Balance => "Refreshing balances...",
                ProgressStep::Session => "Starting session...",
                ProgressStep::Complete => "Done",
            };
            println!("  {}", label);
        };
        match dashboard.session().start_trading(params, Some(&progress)).await? {
            StartOutcome::Started(started) => {
                if let Some(fee) = &started.fee {
                    println!("Fee: ${} in {}", fee.amount_usd, fee.token);
                }
                println!("✓ Session {} running at {}x", started.session_id, started.leverage);
            }
            StartOutcome::Skipped => println!("A session start is already in progress"),
        }
        Ok(())
    }

    async fn handle_session(&self, id: Option<&str>) -> Result<()> {
        let dashboard = self.open_signed_in().await?;
        let id = match id {
            Some(id) => id.to_string(),
            None => dashboard.session().active_session_id().context("No active trading session")?,
        };
        print_session(&dashboard.session().get_trading_session(&id).await?);
        Ok(())
    }

    async fn handle_watch(&self, every: Duration) -> Result<()> {
        let dashboard = self.open_signed_in().await?;
        let cancel = CancellationToken::new();
        let handles = dashboard.spawn_background(cancel.clone());
        let mut ticker = tokio::time::interval(every);

        loop {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => break,
                _ = ticker.tick() => {
                    let summary = dashboard.summary().await;
                    let session = summary
                        .session
                        .as_ref()
                        .map(|s| format!("{} {} pnl {:+}", s.id, s.status, s.total_pnl.round_dp(2)))
                        .unwrap_or_else(|| "none".to_string());
                    println!(
                        "[{}] value ${}  positions {} (pnl {:+})  session {}",
                        Utc::now().format("%H:%M:%S"),
                        summary.total_value.round_dp(2),
                        summary.open_positions,
                        summary.positions_pnl.round_dp(2),
                        session
                    );
                    for error in [summary.wallet_error, summary.positions_error].into_iter().flatten() {
                        println!("  ! {}", error);
                    }
                }
            }
        }

        cancel.cancel();
        for handle in handles {
            handle.await.ok();
        }
        Ok(())
    }
}

fn print_session(session: &TradingSession) {
    println!(
        "{}  {:<9} pnl {:+}  positions {}  budget {} goal {} max {} {}x",
        session.id,
        session.status,
        session.total_pnl.round_dp(2),
        session.positions,
        session.config.total_budget,
        session.config.profit_goal,
        session.config.max_positions,
        session.config.leverage
    );
}

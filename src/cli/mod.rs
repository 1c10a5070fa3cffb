//! `newsdesk` command dispatch. The terminal plays the browser: commands
//! navigate routes through the access gate and render what lands.

pub mod outputformatter;

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::debug;

use crate::api::{ApiClient, PortalClient};
use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};
use crate::feed::{FeedController, FeedOutcome, FeedQuery};
use crate::identity::{Route, SessionManager, TokenStore};
use crate::navigation::Navigator;

use outputformatter::{render_article, render_categories, render_feed, render_status, terminal_width};

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Login { username: String, password: String },
    Logout,
    Status,
    Feed(FeedQuery),
    Article(i64),
    Categories,
    Preferences(Option<Vec<i64>>),
    Open(Route),
    Help,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{0}")]
pub struct UsageError(pub String);

fn usage<S: Into<String>>(msg: S) -> UsageError { UsageError(msg.into()) }

pub fn print_usage(program: &str) {
    eprintln!(
        "Usage:\n  {program} <command> [args]\n\nCommands:\n  login <user> <password>            start a session\n  logout                             end the session\n  status                             show the current session\n  feed [--page N] [--category ID] [--all]\n                                     list articles; --all skips preference narrowing\n  article <id>                       show one article\n  categories                         list categories (preferred ones marked)\n  preferences                        show preferred categories\n  preferences set <id,id,...>        replace preferred categories\n  open <path>                        navigate to a route, e.g. / /news/7 /preferences /admin\n  help                               show this help\n\nEnvironment:\n  NEWSDESK_API_URL           API base URL (default http://127.0.0.1:8000/api/)\n  NEWSDESK_PAGE_SIZE         page size used for page counts (default 10)\n  NEWSDESK_PERSONALIZATION   server | client (default server)\n  NEWSDESK_SESSION_FILE      session file (default $HOME/.newsdesk/session.json)\n  NEWSDESK_TIMEOUT_SECS      request timeout in seconds (default 30)\n  RUST_LOG                   log filter (default warn)"
    );
}

pub fn parse_args(args: &[String]) -> Result<Command, UsageError> {
    let Some(cmd) = args.first() else { return Err(usage("missing command")) };
    let rest = &args[1..];
    match cmd.as_str() {
        "login" => match rest {
            [u, p] => Ok(Command::Login { username: u.clone(), password: p.clone() }),
            _ => Err(usage("login requires <user> <password>")),
        },
        "logout" => no_args(rest, Command::Logout),
        "status" => no_args(rest, Command::Status),
        "categories" => no_args(rest, Command::Categories),
        "feed" => parse_feed(rest).map(Command::Feed),
        "article" => match rest {
            [id] => parse_id(id).map(Command::Article),
            _ => Err(usage("article requires <id>")),
        },
        "preferences" => match rest {
            [] => Ok(Command::Preferences(None)),
            [set, ids] if set == "set" => parse_id_list(ids).map(|v| Command::Preferences(Some(v))),
            _ => Err(usage("preferences takes no arguments or 'set <id,id,...>'")),
        },
        "open" => match rest {
            [path] => Route::parse(path)
                .map(Command::Open)
                .ok_or_else(|| usage(format!("unknown route '{}'", path))),
            _ => Err(usage("open requires <path>")),
        },
        "help" | "-h" | "--help" => Ok(Command::Help),
        other => Err(usage(format!("unrecognized command: {}", other))),
    }
}

fn no_args(rest: &[String], cmd: Command) -> Result<Command, UsageError> {
    if rest.is_empty() { Ok(cmd) } else { Err(usage(format!("unexpected argument: {}", rest[0]))) }
}

fn parse_feed(rest: &[String]) -> Result<FeedQuery, UsageError> {
    let mut query = FeedQuery::default();
    let mut i = 0;
    while i < rest.len() {
        match rest[i].as_str() {
            "--page" => {
                let v = rest.get(i + 1).ok_or_else(|| usage("--page requires a value"))?;
                query.page = v.parse::<u32>().map_err(|_| usage(format!("invalid page '{}'", v)))?;
                i += 2;
            }
            "--category" => {
                let v = rest.get(i + 1).ok_or_else(|| usage("--category requires a value"))?;
                query = query.with_category(parse_id(v)?);
                i += 2;
            }
            "--all" => { query = query.without_preferences(); i += 1; }
            unk => return Err(usage(format!("unrecognized argument: {}", unk))),
        }
    }
    Ok(query)
}

fn parse_id(s: &str) -> Result<i64, UsageError> {
    s.trim()
        .parse::<i64>()
        .ok()
        .filter(|v| *v > 0)
        .ok_or_else(|| usage(format!("invalid id '{}'", s)))
}

fn parse_id_list(s: &str) -> Result<Vec<i64>, UsageError> {
    s.split(',').filter(|p| !p.trim().is_empty()).map(parse_id).collect()
}

/// Wires the session, API and feed together for one process.
pub struct Shell {
    session: Arc<SessionManager>,
    portal: PortalClient,
    feed: Arc<FeedController>,
    navigator: Navigator,
    width: usize,
}

impl Shell {
    pub fn new(cfg: &ClientConfig) -> Result<Self> {
        let store = TokenStore::file(cfg.session_file.clone());
        Self::with_store(cfg, store)
    }

    pub fn with_store(cfg: &ClientConfig, store: TokenStore) -> Result<Self> {
        let session = Arc::new(SessionManager::new(store));
        session.start();
        let api = ApiClient::from_config(cfg).context("failed to build HTTP client")?;
        let portal = PortalClient::new(api, Arc::clone(&session));
        let feed = Arc::new(FeedController::from_config(portal.clone(), cfg));
        let navigator = Navigator::new(Arc::clone(&session)).with_feed(Arc::clone(&feed));
        Ok(Self { session, portal, feed, navigator, width: terminal_width() })
    }

    pub fn session(&self) -> &Arc<SessionManager> { &self.session }

    /// Run one command, returning the lines to print.
    pub async fn execute(&self, cmd: Command) -> ClientResult<Vec<String>> {
        debug!(target: "newsdesk::cli", "execute {:?}", redact(&cmd));
        match cmd {
            Command::Login { username, password } => {
                let identity = self.portal.login(&username, &password).await?;
                Ok(vec![format!("logged in as {}", identity.username)])
            }
            Command::Logout => {
                self.portal.logout();
                Ok(vec!["logged out".to_string()])
            }
            Command::Status => Ok(render_status(&self.session.status())),
            Command::Feed(query) => self.feed_lines(query).await,
            Command::Article(id) => self.open(Route::Article(id)).await,
            Command::Categories => {
                let cats = self.portal.categories().await?;
                let preferred = self.session.preferences();
                Ok(render_categories(&cats, preferred.as_ref(), self.width))
            }
            Command::Preferences(None) => self.open(Route::Preferences).await,
            Command::Preferences(Some(ids)) => {
                let saved = self.portal.save_preferences(&ids).await?;
                Ok(vec![format!("preferred categories: {}", join_ids(&saved.ids()))])
            }
            Command::Open(route) => self.open(route).await,
            Command::Help => Ok(Vec::new()),
        }
    }

    /// Navigate through the gate and render whatever view the user lands on.
    pub async fn open(&self, route: Route) -> ClientResult<Vec<String>> {
        let nav = self.navigator.navigate(route);
        let mut out = Vec::new();
        if nav.redirected() {
            out.push(format!("{} is not available, redirected to {}", nav.requested, nav.landed));
        }
        match nav.landed {
            Route::Home => out.extend(self.feed_lines(FeedQuery::default()).await?),
            Route::Login => out.push("login required: newsdesk login <user> <password>".to_string()),
            Route::Article(id) => {
                let article = self.portal.article(id).await?;
                out.extend(render_article(&article, self.width));
            }
            Route::Preferences => {
                let prefs = self.portal.preferences().await?;
                let cats = self.portal.categories().await?;
                out.extend(render_categories(&cats, Some(&prefs), self.width));
                out.push(format!("preferred categories: {}", join_ids(&prefs.ids())));
            }
            Route::Profile => out.extend(render_status(&self.session.status())),
            Route::Admin => {
                out.push("admin area".to_string());
                out.extend(render_status(&self.session.status()));
            }
        }
        Ok(out)
    }

    async fn feed_lines(&self, query: FeedQuery) -> ClientResult<Vec<String>> {
        match self.feed.load(query).await? {
            FeedOutcome::Ready(page) => Ok(render_feed(&page, self.width)),
            FeedOutcome::Superseded => Ok(Vec::new()),
        }
    }
}

fn join_ids(ids: &[i64]) -> String {
    if ids.is_empty() {
        return "(none)".to_string();
    }
    ids.iter().map(|i| i.to_string()).collect::<Vec<_>>().join(",")
}

fn redact(cmd: &Command) -> Command {
    match cmd {
        Command::Login { username, .. } => Command::Login { username: username.clone(), password: "***".to_string() },
        other => other.clone(),
    }
}

/// Parse, execute and print. Returns the process exit code.
pub async fn run(program: &str, args: Vec<String>, cfg: ClientConfig) -> i32 {
    let cmd = match parse_args(&args) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("{}", e);
            print_usage(program);
            return 2;
        }
    };
    if cmd == Command::Help {
        print_usage(program);
        return 0;
    }
    let shell = match Shell::new(&cfg) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("error: {:#}", e);
            return 1;
        }
    };
    match shell.execute(cmd).await {
        Ok(lines) => {
            for l in lines {
                println!("{}", l);
            }
            0
        }
        Err(e) => {
            report(&e);
            1
        }
    }
}

fn report(e: &ClientError) {
    match e {
        ClientError::Unauthorized { .. } => eprintln!("error: {} (run 'login' to start a session)", e),
        _ => eprintln!("error: {}", e),
    }
}

mod app;
mod buffer;
mod config;
mod controller;
mod fetch;
mod filter;
mod input;
mod live;
mod protocol;
mod render;
mod surface;
mod theme;
mod ui;

use std::io;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tokio::sync::mpsc;

use app::App;
use config::Config;
use controller::{Action, FetchTicket};
use fetch::{HistoryFetcher, HttpFetcher};
use live::{LiveChannel, LiveEvent, LiveSubscription, WsChannel};
use protocol::HistoryResponse;

#[tokio::main]
async fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().collect();
    if args.len() < 2 {
        eprintln!("Usage: porthole <server-url> [alias]");
        eprintln!("       porthole http://localhost:9200 api");
        std::process::exit(1);
    }
    let base_url = args[1].trim_end_matches('/').to_string();
    let requested_alias = args.get(2).cloned();

    init_logging();

    // The alias list is cosmetic; a requested alias works without it.
    let mut aliases = fetch::fetch_aliases(&base_url).await.unwrap_or_default();
    if let Some(alias) = &requested_alias {
        if !aliases.contains(alias) {
            aliases.push(alias.clone());
        }
    }
    if aliases.is_empty() {
        eprintln!("No tracked logs on {} and no alias given", base_url);
        std::process::exit(1);
    }
    let current_idx = requested_alias
        .and_then(|alias| aliases.iter().position(|a| a == &alias))
        .unwrap_or(0);

    let config = Config::from_env();
    let mut state = App::new(&config, aliases, current_idx);

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Setup panic hook to restore terminal on panic
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic| {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), DisableMouseCapture, LeaveAlternateScreen);
        original_hook(panic);
    }));

    let result = run_event_loop(&mut terminal, &mut state, &base_url).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), DisableMouseCapture, LeaveAlternateScreen)?;

    result
}

/// Route tracing to the file named by PORTHOLE_LOG; a TUI cannot share
/// stdout with its own logs.
fn init_logging() {
    let Ok(path) = std::env::var("PORTHOLE_LOG") else {
        return;
    };
    let Ok(file) = std::fs::File::create(path) else {
        return;
    };
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(Arc::new(file))
        .with_ansi(false)
        .init();
}

async fn run_event_loop<'a>(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    state: &mut App<'a>,
    base_url: &str,
) -> Result<()> {
    let (fetch_tx, mut fetch_rx) =
        mpsc::channel::<(FetchTicket, Result<HistoryResponse>)>(8);
    let mut live: Option<LiveSubscription> = None;
    let mut fetcher: Arc<dyn HistoryFetcher> =
        Arc::new(HttpFetcher::new(base_url, state.current_alias()));

    state.connect_current();

    loop {
        state.tick(Instant::now());

        terminal.draw(|frame| {
            ui::draw(frame, state);
        })?;

        let page_size = terminal.size()?.height.saturating_sub(4) as usize;

        tokio::select! {
            // Check for terminal input events
            _ = tokio::time::sleep(Duration::from_millis(16)) => {
                if event::poll(Duration::ZERO)? {
                    match event::read()? {
                        Event::Key(key) => {
                            if key.kind == KeyEventKind::Press {
                                input::handle_key(state, key, page_size);
                            }
                        }
                        Event::Mouse(mouse) => {
                            input::handle_mouse(state, mouse);
                        }
                        _ => {}
                    }
                }
            }

            // New live-channel events
            Some(event) = next_live_event(&mut live) => {
                state.on_live_event(event);
            }

            // Completed history fetches
            Some((ticket, result)) = fetch_rx.recv() => {
                state.on_history(ticket, result);
            }
        }

        for action in state.take_actions() {
            match action {
                Action::CloseLive => {
                    // Dropping the subscription aborts its reader task
                    live = None;
                }
                Action::OpenLive => {
                    let channel = WsChannel::new(base_url, state.current_alias());
                    fetcher = Arc::new(HttpFetcher::new(base_url, state.current_alias()));
                    live = Some(channel.open().await);
                }
                Action::Fetch(ticket, req) => {
                    let fetcher = Arc::clone(&fetcher);
                    let tx = fetch_tx.clone();
                    tokio::spawn(async move {
                        let result = fetcher.fetch(&req).await;
                        let _ = tx.send((ticket, result)).await;
                    });
                }
            }
        }

        if state.should_quit {
            break;
        }
    }

    Ok(())
}

/// Resolve the next live event, or park forever while no channel is open.
async fn next_live_event(live: &mut Option<LiveSubscription>) -> Option<LiveEvent> {
    match live {
        Some(subscription) => subscription.events.recv().await,
        None => std::future::pending().await,
    }
}

use std::io;
use std::time::Duration;

use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use docgraph_client::{
    logging, session::SessionState, ApiClient, ClientConfig, DocumentBackend, SyncedGraph,
    WorkspaceApi,
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tokio::sync::mpsc;
use uuid::Uuid;

mod app;
mod ui;

use app::{App, AppEvent, View};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    // Parse CLI arguments
    let args: Vec<String> = std::env::args().collect();
    let mut open_document: Option<Uuid> = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--document" => {
                let Some(raw) = args.get(i + 1) else {
                    eprintln!("Error: --document requires a document id");
                    std::process::exit(1);
                };
                match raw.parse() {
                    Ok(id) => open_document = Some(id),
                    Err(_) => {
                        eprintln!("Error: '{}' is not a valid document id", raw);
                        std::process::exit(1);
                    }
                }
                i += 2;
            }
            "--help" | "-h" => {
                println!("Usage: docgraph [OPTIONS]");
                println!();
                println!("Options:");
                println!("  --document <ID>  Open a document's relationships on start");
                println!("  --help, -h       Show this help message");
                println!();
                println!("Environment:");
                println!("  DOCGRAPH_SERVER_URL       Backend URL (default http://localhost:3000)");
                println!("  DOCGRAPH_API_TOKEN        Bearer token for the backend");
                println!("  DOCGRAPH_WORKSPACE_ID     Workspace to open");
                println!("  DOCGRAPH_SYNC_TIMEOUT_MS  Wait before a change is rolled back");
                return Ok(());
            }
            _ => {
                eprintln!("Unknown argument: {}", args[i]);
                std::process::exit(1);
            }
        }
    }

    if let Err(e) = logging::init() {
        eprintln!("Warning: logging disabled: {:#}", e);
    }

    let config = ClientConfig::from_env()?;

    // Workspace: environment first, then the last session, else a new one
    let previous = SessionState::load().unwrap_or_else(|e| {
        tracing::warn!(error = %e, "ignoring unreadable session file");
        None
    });
    let workspace_id = config
        .workspace_id
        .or(previous.as_ref().map(|s| s.workspace_id))
        .unwrap_or_else(Uuid::new_v4);
    let open_document = open_document.or_else(|| {
        previous
            .filter(|s| s.workspace_id == workspace_id)
            .and_then(|s| s.document_id)
    });
    tracing::info!(%workspace_id, server = %config.server_url, "starting");

    let api = ApiClient::new(&config.server_url).with_token(config.api_token.clone());
    let synced = SyncedGraph::new(WorkspaceApi::new(api, workspace_id), config.sync_timeout);
    let mut app = App::new(synced, workspace_id);

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Run app
    app.load_workspace().await;
    if let Some(id) = open_document {
        app.open_document(id).await;
    }
    let res = run_app(&mut terminal, &mut app).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    let session = SessionState {
        workspace_id,
        document_id: if app.view == View::Relationships { app.focus } else { None },
    };
    if let Err(e) = session.save() {
        tracing::warn!(error = %e, "could not save session");
    }

    if let Err(err) = res {
        eprintln!("Error: {:?}", err);
    }

    Ok(())
}

async fn run_app<T, B>(terminal: &mut Terminal<T>, app: &mut App<B>) -> Result<()>
where
    T: ratatui::backend::Backend,
    B: DocumentBackend,
{
    // Create event channel
    let (tx, mut rx) = mpsc::channel::<AppEvent>(100);

    // Spawn input handler
    tokio::spawn(async move {
        loop {
            if event::poll(Duration::from_millis(100)).unwrap_or(false) {
                if let Ok(Event::Key(key)) = event::read() {
                    if key.kind == KeyEventKind::Press
                        && tx.send(AppEvent::Key(key)).await.is_err()
                    {
                        break;
                    }
                }
            }
            // Send tick events for UI refresh
            if tx.send(AppEvent::Tick).await.is_err() {
                break;
            }
        }
    });

    loop {
        app.sync_view();
        terminal.draw(|f| ui::draw(f, &*app))?;

        match rx.recv().await {
            Some(AppEvent::Key(key)) => {
                if app.handle_key(key).await? {
                    return Ok(());
                }
            }
            Some(AppEvent::Tick) => {
                // Just refresh UI
            }
            None => return Ok(()),
        }
    }
}

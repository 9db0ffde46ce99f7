mod api;
mod app;
mod config;
mod forms;
mod layout;
mod logging;
mod overlay;
mod ticker;
mod toast;
mod ui;

use api::{AdminClient, NewPermission, NewUser};
use app::{App, InputMode, Matcher};
use clap::{Parser, Subcommand};
use config::PanelConfig;
use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
    KeyModifiers, MouseButton, MouseEvent, MouseEventKind,
};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use overlay::OverlayId;
use ratatui::layout::Rect;
use std::io::Write;
use std::path::PathBuf;
use std::time::{Duration, Instant};

/// Terminal admin panel for users, permissions and online visitors
#[derive(Parser)]
#[command(version, about)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Admin backend URL (overrides the config file)
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Path to the config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the interactive panel (default)
    Run,
    /// Print the users list
    Users {
        /// Substring or wildcard pattern (* and ?)
        #[arg(short, long)]
        filter: Option<String>,
    },
    /// Create a user
    AddUser {
        #[arg(short, long)]
        username: String,
        #[arg(short, long)]
        email: Option<String>,
        /// Prompted for when omitted
        #[arg(short, long)]
        password: Option<String>,
        #[arg(short, long, default_value = "user")]
        role: String,
    },
    /// Create a permission
    AddPermission {
        name: String,
        #[arg(short, long, default_value = "general")]
        category: String,
    },
    /// Delete a user by id
    DeleteUser {
        id: i64,
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
}

/// Rows moved per mouse wheel notch.
const SCROLL_STEP: i32 = 3;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let command = cli.command.unwrap_or(Commands::Run);

    let config = match PanelConfig::load(cli.config.as_deref()) {
        Ok(config) => config.with_base_url(cli.base_url),
        Err(e) => {
            eprintln!("Error: {}", e.user_message());
            std::process::exit(1);
        }
    };
    if let Err(e) = config.validate() {
        eprintln!("Error: {}", e.user_message());
        std::process::exit(1);
    }

    match &command {
        Commands::Run => {
            if let Some(path) = logging::init_file(&config.log_level) {
                tracing::info!(log = %path.display(), "admin panel starting");
            }
        }
        _ => logging::init_stderr(&config.log_level),
    }

    let client = AdminClient::new(
        &config.base_url,
        Duration::from_secs(config.request_timeout_secs),
        &config.online_path,
    )?;

    match command {
        Commands::Users { filter } => {
            let users = match client.list_users().await {
                Ok(users) => users,
                Err(e) => fail(e.user_message()),
            };
            let matcher = Matcher::new(filter.as_deref().unwrap_or(""));
            for user in users.iter().filter(|u| matcher.matches_user(u)) {
                println!(
                    "{:>5}  {:<20} {:<30} {}",
                    user.id,
                    user.username,
                    user.email.as_deref().unwrap_or("-"),
                    user.permissions.join(",")
                );
            }
        }
        Commands::AddUser {
            username,
            email,
            password,
            role,
        } => {
            let password = match password {
                Some(p) => p,
                None => {
                    eprint!("Password for {}: ", username);
                    read_password_with_stars()?
                }
            };
            let new_user = NewUser {
                username,
                email: email.unwrap_or_default(),
                password,
                role,
            };
            match client.add_user(&new_user).await {
                Ok(username) => eprintln!("User added: {}", username),
                Err(e) => fail(e.user_message()),
            }
        }
        Commands::AddPermission { name, category } => {
            match client.add_permission(&NewPermission { name, category }).await {
                Ok(name) => eprintln!("Permission added: {}", name),
                Err(e) => fail(e.user_message()),
            }
        }
        Commands::DeleteUser { id, yes } => {
            if !yes && !confirm_on_stdin(&format!("Delete user {}? This cannot be undone. [y/N] ", id))? {
                eprintln!("Cancelled.");
                return Ok(());
            }
            match client.delete_user(id).await {
                Ok(message) => eprintln!("{}", message),
                Err(e) => fail(e.user_message()),
            }
        }
        Commands::Run => {
            let mut app = App::new(config, client, Instant::now());

            // Init terminal
            let mut terminal = ratatui::init();
            let result = run_panel(&mut terminal, &mut app).await;

            // Restore terminal
            let _ = crossterm::execute!(std::io::stdout(), DisableMouseCapture);
            ratatui::restore();

            if let Err(e) = result {
                tracing::error!(error = %e, "event loop failed");
                eprintln!("Error: {e}");
                std::process::exit(1);
            }
            tracing::info!("admin panel closed");
        }
    }

    Ok(())
}

fn fail(message: String) -> ! {
    eprintln!("Error: {}", message);
    std::process::exit(1);
}

/// Everything between terminal init and restore, so every failure still
/// reaches the restore path.
async fn run_panel(
    terminal: &mut ratatui::DefaultTerminal,
    app: &mut App,
) -> Result<(), Box<dyn std::error::Error>> {
    crossterm::execute!(std::io::stdout(), EnableMouseCapture)?;

    let size = terminal.size()?;
    app.resize(Rect::new(0, 0, size.width, size.height));
    app.reload().await;

    run_app(terminal, app).await
}

async fn run_app(
    terminal: &mut ratatui::DefaultTerminal,
    app: &mut App,
) -> Result<(), Box<dyn std::error::Error>> {
    // Wake often enough to keep the ticker moving
    let poll = Duration::from_millis(app.config.ticker_interval_ms.clamp(1, 250));

    loop {
        app.tick(Instant::now());
        terminal.draw(|frame| ui::render(app, frame))?;

        if app.should_quit {
            return Ok(());
        }

        if crossterm::event::poll(poll)? {
            match event::read()? {
                Event::Key(key) => {
                    if key.kind != KeyEventKind::Press {
                        continue;
                    }
                    handle_key(app, key).await;
                }
                Event::Mouse(mouse) => handle_mouse(app, mouse).await,
                Event::Resize(width, height) => {
                    app.resize(Rect::new(0, 0, width, height));
                }
                _ => {}
            }
        }
    }
}

async fn handle_key(app: &mut App, key: KeyEvent) {
    // Ctrl+C always quits
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        app.should_quit = true;
        return;
    }

    // Escape closes open menus before anything else sees it
    if !app.overlays.dispatch_key(&key).is_empty() {
        return;
    }

    if app.confirm.is_some() {
        app.handle_confirm_key(key).await;
        return;
    }
    if app.form.is_some() {
        app.handle_form_key(key).await;
        return;
    }

    // If help is showing, any key closes it
    if app.show_help {
        app.show_help = false;
        return;
    }

    if app.input_mode == InputMode::Editing {
        handle_filter_input(app, key);
        return;
    }
    handle_page_key(app, key).await;
}

fn handle_filter_input(app: &mut App, key: KeyEvent) {
    let mut changed = false;
    match key.code {
        KeyCode::Enter | KeyCode::Esc => {
            app.input_mode = InputMode::Normal;
        }
        KeyCode::Backspace => {
            app.filter.pop();
            changed = true;
        }
        KeyCode::Char(c) => {
            app.filter.push(c);
            changed = true;
        }
        _ => {}
    }

    if changed {
        app.apply_filter();
    }
}

async fn handle_page_key(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('q') => {
            app.should_quit = true;
        }
        KeyCode::Char('?') => {
            app.show_help = true;
        }
        KeyCode::Char('/') => {
            app.input_mode = InputMode::Editing;
        }
        KeyCode::Down | KeyCode::Char('j') => app.select_next(),
        KeyCode::Up | KeyCode::Char('k') => app.select_prev(),
        KeyCode::PageDown => app.select_page_down(),
        KeyCode::PageUp => app.select_page_up(),
        KeyCode::Char('g') => app.select_first(),
        KeyCode::Char('G') => app.select_last(),
        KeyCode::Tab => {
            let next = app.view.next();
            app.set_view(next);
        }
        KeyCode::Char('m') => app.toggle_overlay(OverlayId::MobileNav),
        KeyCode::Char('u') => app.toggle_overlay(OverlayId::UserDropdown),
        KeyCode::Char('o') => app.toggle_overlay(OverlayId::OnlineList),
        KeyCode::Char('a') => app.open_form(),
        KeyCode::Char('d') | KeyCode::Delete => app.request_delete(),
        KeyCode::Char('r') => {
            app.status_msg = "Reloading...".to_string();
            app.reload().await;
        }
        KeyCode::Esc => {
            // Clear filter
            if !app.filter.is_empty() {
                app.filter.clear();
                app.apply_filter();
            }
        }
        _ => {}
    }
}

async fn handle_mouse(app: &mut App, mouse: MouseEvent) {
    if app.show_help {
        if matches!(mouse.kind, MouseEventKind::Down(_)) {
            app.show_help = false;
        }
        return;
    }
    // Forms and confirmations are keyboard-only
    if app.modal_open() {
        return;
    }

    match mouse.kind {
        MouseEventKind::Down(MouseButton::Left) => app.click(mouse.column, mouse.row).await,
        MouseEventKind::ScrollDown => app.scroll_by(SCROLL_STEP),
        MouseEventKind::ScrollUp => app.scroll_by(-SCROLL_STEP),
        _ => {}
    }
}

fn confirm_on_stdin(prompt: &str) -> Result<bool, Box<dyn std::error::Error>> {
    eprint!("{}", prompt);
    std::io::stderr().flush()?;
    let mut answer = String::new();
    std::io::stdin().read_line(&mut answer)?;
    Ok(matches!(answer.trim(), "y" | "Y" | "yes" | "Yes"))
}

fn read_password_with_stars() -> Result<String, Box<dyn std::error::Error>> {
    let mut password = String::new();
    enable_raw_mode()?;

    let res = (|| -> Result<String, Box<dyn std::error::Error>> {
        loop {
            if let Event::Key(event) = event::read()? {
                if event.kind == KeyEventKind::Release {
                    continue;
                }
                match event.code {
                    KeyCode::Enter => {
                        eprintln!();
                        break;
                    }
                    KeyCode::Backspace => {
                        if password.pop().is_some() {
                            eprint!("\u{0008} \u{0008}");
                            std::io::stderr().flush()?;
                        }
                    }
                    KeyCode::Char('c') if event.modifiers.contains(KeyModifiers::CONTROL) => {
                        eprintln!();
                        return Err("Interrupted by user".into());
                    }
                    KeyCode::Char(c) => {
                        password.push(c);
                        eprint!("*");
                        std::io::stderr().flush()?;
                    }
                    _ => {}
                }
            }
        }
        Ok(password.clone())
    })();

    disable_raw_mode()?;
    res
}

#[cfg(test)]
mod tests {
    use super::*;

    fn panel() -> App {
        // Never contacted by these tests.
        let client = AdminClient::new("http://127.0.0.1:9", Duration::from_secs(1), "/online").unwrap();
        let mut app = App::new(PanelConfig::default(), client, Instant::now());
        app.resize(Rect::new(0, 0, 100, 30));
        app
    }

    fn esc() -> KeyEvent {
        KeyEvent::new(KeyCode::Esc, KeyModifiers::NONE)
    }

    #[test]
    fn test_cli_defaults_to_run() {
        let cli = Cli::try_parse_from(["admin-panel"]).unwrap();
        assert!(cli.command.is_none());
        assert!(cli.base_url.is_none());
    }

    #[test]
    fn test_cli_delete_user_flags() {
        let cli = Cli::try_parse_from(["admin-panel", "delete-user", "42", "--yes", "--base-url", "http://x"])
            .unwrap();
        match cli.command {
            Some(Commands::DeleteUser { id, yes }) => {
                assert_eq!(id, 42);
                assert!(yes);
            }
            _ => panic!("Expected delete-user"),
        }
        assert_eq!(cli.base_url.as_deref(), Some("http://x"));
    }

    #[test]
    fn test_cli_add_user_defaults() {
        let cli = Cli::try_parse_from(["admin-panel", "add-user", "--username", "nour"]).unwrap();
        match cli.command {
            Some(Commands::AddUser { username, email, password, role }) => {
                assert_eq!(username, "nour");
                assert_eq!(email, None);
                assert_eq!(password, None);
                assert_eq!(role, "user");
            }
            _ => panic!("Expected add-user"),
        }
    }

    #[tokio::test]
    async fn test_escape_closes_menu_before_filter_editing() {
        let mut app = panel();
        app.input_mode = InputMode::Editing;
        app.toggle_overlay(OverlayId::UserDropdown);
        assert!(app.overlays.is_open(OverlayId::UserDropdown));

        handle_key(&mut app, esc()).await;
        assert!(!app.overlays.any_open());
        assert_eq!(app.input_mode, InputMode::Editing);

        handle_key(&mut app, esc()).await;
        assert_eq!(app.input_mode, InputMode::Normal);
    }

    #[tokio::test]
    async fn test_escape_closes_menu_before_form() {
        let mut app = panel();
        app.open_form();
        app.toggle_overlay(OverlayId::OnlineList);
        assert!(app.overlays.is_open(OverlayId::OnlineList));

        handle_key(&mut app, esc()).await;
        assert!(!app.overlays.any_open());
        assert!(app.form.is_some());

        handle_key(&mut app, esc()).await;
        assert!(app.form.is_none());
    }
}

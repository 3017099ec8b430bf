use clap::Subcommand;
use workblock_core::integrations::{GoogleAuth, Integration, TodoistAuth};

#[derive(Subcommand)]
pub enum AuthAction {
    /// Todoist: login / logout / status
    Todoist {
        #[command(subcommand)]
        action: TodoistOp,
    },
    /// Google Calendar: login / logout / status
    Google {
        #[command(subcommand)]
        action: GoogleOp,
    },
}

#[derive(Subcommand)]
pub enum TodoistOp {
    /// Store an API token in the OS keyring
    Login {
        /// Todoist API token
        #[arg(long)]
        token: String,
    },
    /// Remove the stored token
    Logout,
    /// Check authentication status
    Status,
}

#[derive(Subcommand)]
pub enum GoogleOp {
    /// Run the OAuth flow in the browser
    Login {
        /// OAuth client ID
        #[arg(long)]
        client_id: String,
        /// OAuth client secret
        #[arg(long)]
        client_secret: String,
    },
    /// Remove stored tokens
    Logout,
    /// Check authentication status
    Status,
}

pub fn run(action: AuthAction) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        AuthAction::Todoist { action: op } => handle_todoist(op),
        AuthAction::Google { action: op } => handle_google(op),
    }
}

fn handle_todoist(op: TodoistOp) -> Result<(), Box<dyn std::error::Error>> {
    match op {
        TodoistOp::Login { token } => {
            TodoistAuth::with_token(token).authenticate()?;
            println!("Todoist authenticated");
        }
        TodoistOp::Logout => {
            TodoistAuth::new().disconnect()?;
            println!("Todoist disconnected");
        }
        TodoistOp::Status => print_status(&TodoistAuth::new()),
    }
    Ok(())
}

fn handle_google(op: GoogleOp) -> Result<(), Box<dyn std::error::Error>> {
    match op {
        GoogleOp::Login {
            client_id,
            client_secret,
        } => {
            let mut g = GoogleAuth::new();
            g.set_credentials(&client_id, &client_secret)?;
            g.authenticate()?;
            println!("Google authenticated");
        }
        GoogleOp::Logout => {
            GoogleAuth::new().disconnect()?;
            println!("Google disconnected");
        }
        GoogleOp::Status => print_status(&GoogleAuth::new()),
    }
    Ok(())
}

fn print_status(integration: &dyn Integration) {
    let state = if integration.is_authenticated() {
        "authenticated"
    } else {
        "not authenticated"
    };
    println!("{}: {state}", integration.display_name());
}

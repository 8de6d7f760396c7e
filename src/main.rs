use chrono::{Days, Local, NaiveDate};
use clap::{Args, Parser, Subcommand};
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use tabled::{settings::Style, Table, Tabled};
use tracing::{error, warn};
use tracing_subscriber::EnvFilter;

use invoicetree::backend::{AuthProvider, GoTrueAuth, RestStore, Session};
use invoicetree::clients::{create_client, find_client, list_clients};
use invoicetree::companies::{company_ids, create_company, find_company, list_companies};
use invoicetree::config::{
    clear_session, config_dir, load_config, load_session, resolve_output_dir, save_session,
    Config, Settings, CONFIG_TEMPLATE, SETTINGS_TEMPLATE,
};
use invoicetree::dashboard::{fetch_dashboard, DashboardStats};
use invoicetree::error::{InvoiceError, Result};
use invoicetree::format::format_money;
use invoicetree::invoice::{
    create_invoice, delete_invoice, get_items, list_invoices, load_document, next_invoice_number,
    parse_item_input, resolve_invoice, set_status, update_invoice, InvoiceDraft, LineItemInput,
};
use invoicetree::model::{Invoice, InvoiceStatus, NewClient, NewCompany};
use invoicetree::pdf::generate_pdf;
use invoicetree::session::{restore_session, GateState, SessionGate};
use invoicetree::validate;

#[derive(Parser)]
#[command(name = "invoicetree")]
#[command(version, about = "Invoicing for companies, clients and invoices on a hosted backend", long_about = None)]
struct Cli {
    /// Path to config directory (default: XDG config dir)
    #[arg(short = 'C', long, global = true)]
    config_dir: Option<PathBuf>,

    /// Log requests and state changes to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize config directory with template files
    Init,

    /// Show session and onboarding state
    Status,

    /// Create an account
    Signup(Credentials),

    /// Sign in
    Login(Credentials),

    /// Sign out and forget the stored session
    Logout,

    /// Create your first company
    Onboard(CompanyArgs),

    /// Show invoice, revenue and client totals
    Dashboard,

    /// Manage companies
    #[command(subcommand)]
    Companies(CompanyCommand),

    /// Manage clients
    #[command(subcommand)]
    Clients(ClientCommand),

    /// Manage invoices
    #[command(subcommand)]
    Invoices(InvoiceCommand),

    /// Local preferences
    #[command(subcommand)]
    Settings(SettingsCommand),
}

#[derive(Args)]
struct Credentials {
    #[arg(short, long)]
    email: String,

    /// Password (prompted on stdin when omitted)
    #[arg(short, long)]
    password: Option<String>,
}

#[derive(Args)]
struct CompanyArgs {
    #[arg(short, long)]
    name: String,
    #[arg(long, default_value = "")]
    tax_id: String,
    #[arg(long, default_value = "")]
    address: String,
    #[arg(long, default_value = "")]
    phone: String,
    #[arg(long, default_value = "")]
    email: String,
    #[arg(long)]
    logo_url: Option<String>,
}

impl From<CompanyArgs> for NewCompany {
    fn from(args: CompanyArgs) -> Self {
        NewCompany {
            name: args.name,
            tax_id: args.tax_id,
            address: args.address,
            phone: args.phone,
            email: args.email,
            logo_url: args.logo_url,
        }
    }
}

#[derive(Subcommand)]
enum CompanyCommand {
    /// List your companies
    List,
    /// Add a company
    Add(CompanyArgs),
}

#[derive(Subcommand)]
enum ClientCommand {
    /// List clients of your companies
    List,
    /// Add a client
    Add {
        /// Company name or id (default: your first company)
        #[arg(long)]
        company: Option<String>,
        #[arg(short, long)]
        name: String,
        #[arg(long, default_value = "")]
        tax_id: String,
        #[arg(long, default_value = "")]
        address: String,
        #[arg(long, default_value = "")]
        phone: String,
        #[arg(long, default_value = "")]
        email: String,
    },
}

/// Header fields shared by `invoices new` and `invoices edit`.
#[derive(Args)]
struct InvoiceFields {
    /// Line items as "description:quantity:unit_price[:tax%[:discount%]]" (repeatable)
    #[arg(short, long, value_name = "DESC:QTY:PRICE[:TAX[:DISC]]")]
    item: Vec<String>,

    /// Invoice number
    #[arg(long)]
    number: Option<String>,

    /// Issue date (YYYY-MM-DD)
    #[arg(long)]
    issue_date: Option<String>,

    /// Due date (YYYY-MM-DD)
    #[arg(long)]
    due_date: Option<String>,

    #[arg(long)]
    notes: Option<String>,

    #[arg(long)]
    terms: Option<String>,

    #[arg(long)]
    payment_terms: Option<String>,
}

#[derive(Subcommand)]
enum InvoiceCommand {
    /// List invoices, newest first
    List,

    /// Show an invoice with its line items
    Show {
        /// Invoice number or index from 'invoices list'
        invoice: String,
    },

    /// Create an invoice
    New {
        /// Client name or id
        #[arg(short, long)]
        client: String,

        /// Company name or id (default: your first company)
        #[arg(long)]
        company: Option<String>,

        #[command(flatten)]
        fields: InvoiceFields,
    },

    /// Edit an invoice; given items replace all existing ones
    Edit {
        /// Invoice number or index from 'invoices list'
        invoice: String,

        /// Client name or id
        #[arg(short, long)]
        client: Option<String>,

        #[command(flatten)]
        fields: InvoiceFields,
    },

    /// Set an invoice's status (draft, pending, paid, overdue)
    Status {
        /// Invoice number or index from 'invoices list'
        invoice: String,
        status: String,
    },

    /// Delete an invoice
    Delete {
        /// Invoice number or index from 'invoices list'
        invoice: String,

        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },

    /// Render an invoice to PDF
    Render {
        /// Invoice number or index from 'invoices list'
        invoice: String,

        /// Custom output file path (default: output_dir/<number>.pdf)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Open generated PDF with system default viewer
        #[arg(long)]
        open: bool,
    },
}

#[derive(Subcommand)]
enum SettingsCommand {
    /// Show current preferences
    Show,
    /// Change one preference (e.g. 'currency EUR')
    Set { key: String, value: String },
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("invoicetree=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn run(cli: Cli) -> Result<()> {
    let cfg_dir = match cli.config_dir {
        Some(p) => p,
        None => config_dir()?,
    };

    match cli.command {
        Commands::Init => cmd_init(&cfg_dir),
        Commands::Status => cmd_status(&Context::load(&cfg_dir)?),
        Commands::Signup(creds) => cmd_signup(&Context::load(&cfg_dir)?, creds),
        Commands::Login(creds) => cmd_login(&Context::load(&cfg_dir)?, creds),
        Commands::Logout => cmd_logout(&Context::load(&cfg_dir)?),
        Commands::Onboard(args) => cmd_onboard(&Context::load(&cfg_dir)?, args.into()),
        Commands::Dashboard => cmd_dashboard(&Context::load(&cfg_dir)?),
        Commands::Companies(command) => {
            let ctx = Context::load(&cfg_dir)?;
            match command {
                CompanyCommand::List => cmd_companies(&ctx),
                CompanyCommand::Add(args) => cmd_add_company(&ctx, args.into()),
            }
        }
        Commands::Clients(command) => {
            let ctx = Context::load(&cfg_dir)?;
            match command {
                ClientCommand::List => cmd_clients(&ctx),
                ClientCommand::Add {
                    company,
                    name,
                    tax_id,
                    address,
                    phone,
                    email,
                } => cmd_add_client(
                    &ctx,
                    company.as_deref(),
                    NewClient {
                        name,
                        tax_id,
                        address,
                        phone,
                        email,
                    },
                ),
            }
        }
        Commands::Invoices(command) => {
            let ctx = Context::load(&cfg_dir)?;
            match command {
                InvoiceCommand::List => cmd_invoices(&ctx),
                InvoiceCommand::Show { invoice } => cmd_show_invoice(&ctx, &invoice),
                InvoiceCommand::New {
                    client,
                    company,
                    fields,
                } => cmd_new_invoice(&ctx, &client, company.as_deref(), fields),
                InvoiceCommand::Edit {
                    invoice,
                    client,
                    fields,
                } => cmd_edit_invoice(&ctx, &invoice, client.as_deref(), fields),
                InvoiceCommand::Status { invoice, status } => {
                    cmd_set_status(&ctx, &invoice, &status)
                }
                InvoiceCommand::Delete { invoice, yes } => cmd_delete_invoice(&ctx, &invoice, yes),
                InvoiceCommand::Render {
                    invoice,
                    output,
                    open,
                } => cmd_render_invoice(&ctx, &invoice, output, open),
            }
        }
        Commands::Settings(command) => {
            let ctx = Context::load(&cfg_dir)?;
            match command {
                SettingsCommand::Show => cmd_settings(&ctx),
                SettingsCommand::Set { key, value } => cmd_set_setting(&ctx, &key, &value),
            }
        }
    }
}

/// Local state every command starts from.
struct Context {
    cfg_dir: PathBuf,
    config: Config,
    settings: Settings,
}

impl Context {
    fn load(cfg_dir: &Path) -> Result<Self> {
        Ok(Self {
            cfg_dir: cfg_dir.to_path_buf(),
            config: load_config(cfg_dir)?,
            settings: Settings::load(cfg_dir)?,
        })
    }

    fn symbol(&self) -> &'static str {
        self.settings.currency_symbol()
    }

    /// Restore the stored session (refreshing it if needed) and run the gate.
    /// Without a stored session no backend is contacted.
    fn connect(&self) -> Result<Connection> {
        let mut gate = SessionGate::new();
        if load_session(&self.cfg_dir)?.is_none() {
            return Ok(Connection { gate, store: None });
        }

        let backend = self.config.backend()?;
        let session = restore_session(&self.cfg_dir, &GoTrueAuth::new(backend))?;
        let store = RestStore::new(backend, session.as_ref().map(|s| s.access_token.as_str()));
        gate.on_auth_state_change(session, &store);
        Ok(Connection {
            gate,
            store: Some(store),
        })
    }

    /// Persist a new session and run the gate on it, as any auth state change does.
    fn adopt_session(&self, session: Session) -> Result<Connection> {
        save_session(&self.cfg_dir, &session)?;
        let store = RestStore::new(self.config.backend()?, Some(&session.access_token));
        let mut gate = SessionGate::new();
        gate.on_auth_state_change(Some(session), &store);
        Ok(Connection {
            gate,
            store: Some(store),
        })
    }
}

struct Connection {
    gate: SessionGate,
    store: Option<RestStore>,
}

impl Connection {
    fn signed_in(&self) -> Result<(&RestStore, &Session)> {
        let session = self.gate.require_session()?;
        let store = self.store.as_ref().ok_or(InvoiceError::NotSignedIn)?;
        Ok((store, session))
    }

    fn onboarded(&self) -> Result<(&RestStore, &Session)> {
        self.gate.require_company()?;
        self.signed_in()
    }
}

/// Initialize config directory with template files
fn cmd_init(cfg_dir: &Path) -> Result<()> {
    use std::fs;

    if cfg_dir.exists() {
        return Err(InvoiceError::AlreadyInitialized(cfg_dir.to_path_buf()));
    }

    fs::create_dir_all(cfg_dir)?;
    fs::create_dir_all(cfg_dir.join("output"))?;
    fs::write(cfg_dir.join("config.toml"), CONFIG_TEMPLATE)?;
    fs::write(cfg_dir.join("settings.toml"), SETTINGS_TEMPLATE)?;

    println!("Initialized invoicetree config at: {}", cfg_dir.display());
    println!();
    println!("Next steps:");
    println!(
        "  1. Set your backend URL and key:  $EDITOR {}/config.toml",
        cfg_dir.display()
    );
    println!("  2. Create an account:             invoicetree signup --email <email>");
    println!("  3. Set up your company:           invoicetree onboard --name <company>");

    Ok(())
}

fn print_gate(state: GateState) {
    match state {
        GateState::Unauthenticated => println!("Not signed in."),
        GateState::NoCompany => {
            println!("No company set up yet.");
            println!("  invoicetree onboard --name <company>");
        }
        GateState::HasCompany => println!("Ready. Try 'invoicetree dashboard'."),
    }
}

/// Show session and onboarding state
fn cmd_status(ctx: &Context) -> Result<()> {
    let conn = ctx.connect()?;

    println!("Session Status");
    println!("{}", "-".repeat(50));
    println!("Config directory: {}", ctx.cfg_dir.display());
    if ctx.config.backend.url.is_empty() {
        println!("Backend:          (not configured)");
    } else {
        println!("Backend:          {}", ctx.config.backend.url);
    }
    match conn.gate.session() {
        Some(session) => println!(
            "Signed in as:     {}",
            session.user.email.as_deref().unwrap_or("(no email)")
        ),
        None => println!("Signed in as:     -"),
    }
    let onboarding = match conn.gate.state() {
        GateState::Unauthenticated => "-",
        GateState::NoCompany => "company required",
        GateState::HasCompany => "complete",
    };
    println!("Onboarding:       {onboarding}");
    println!();
    print_gate(conn.gate.state());

    Ok(())
}

/// Password from the flag, or one line of stdin.
fn read_password(flag: Option<String>) -> Result<String> {
    if let Some(password) = flag {
        return Ok(password);
    }
    eprint!("Password: ");
    io::stderr().flush()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

fn cmd_signup(ctx: &Context, creds: Credentials) -> Result<()> {
    let email = validate::email(&creds.email)?.to_string();
    let password = read_password(creds.password)?;
    validate::password(&password)?;

    let auth = GoTrueAuth::new(ctx.config.backend()?);
    match auth.sign_up(&email, &password)? {
        Some(session) => {
            println!("Signed up as {email}");
            let conn = ctx.adopt_session(session)?;
            print_gate(conn.gate.state());
        }
        None => {
            println!("Signed up as {email}");
            println!("Check your inbox to confirm the address, then run 'invoicetree login'.");
        }
    }
    Ok(())
}

fn cmd_login(ctx: &Context, creds: Credentials) -> Result<()> {
    let email = validate::email(&creds.email)?.to_string();
    let password = read_password(creds.password)?;
    validate::password(&password)?;

    let auth = GoTrueAuth::new(ctx.config.backend()?);
    let session = auth.sign_in(&email, &password)?;
    println!("Signed in as {email}");
    let conn = ctx.adopt_session(session)?;
    print_gate(conn.gate.state());
    Ok(())
}

fn cmd_logout(ctx: &Context) -> Result<()> {
    let Some(session) = load_session(&ctx.cfg_dir)? else {
        println!("Not signed in.");
        return Ok(());
    };

    // The local session goes regardless; a failed remote sign-out only gets logged.
    if let Err(e) = ctx
        .config
        .backend()
        .and_then(|backend| GoTrueAuth::new(backend).sign_out(&session))
    {
        warn!(error = %e, "remote sign-out failed");
    }
    clear_session(&ctx.cfg_dir)?;

    println!("Signed out.");
    print_gate(ctx.connect()?.gate.state());
    Ok(())
}

fn cmd_onboard(ctx: &Context, company: NewCompany) -> Result<()> {
    let conn = ctx.connect()?;
    let (store, session) = conn.signed_in()?;
    if conn.gate.state() == GateState::HasCompany {
        return Err(InvoiceError::Validation(
            "Onboarding is already complete. Use 'invoicetree companies add' to add another company."
                .to_string(),
        ));
    }

    let created = create_company(store, session.user.id, &company).inspect_err(|e| {
        error!(error = %e, "error creating company");
    })?;
    println!("Created company {}", created.name);

    // Point-in-time gate: reload to pick up the new company.
    let conn = ctx.connect()?;
    print_gate(conn.gate.state());
    Ok(())
}

fn cmd_dashboard(ctx: &Context) -> Result<()> {
    let conn = ctx.connect()?;
    let (store, session) = conn.onboarded()?;

    let stats = fetch_dashboard(store, session.user.id).unwrap_or_else(|e| {
        error!(error = %e, "error fetching dashboard stats");
        DashboardStats::default()
    });

    println!("Dashboard");
    println!("{}", "-".repeat(50));
    println!(
        "Total invoices:   {} ({} pending)",
        stats.total_invoices, stats.pending_invoices
    );
    println!(
        "Revenue:          {} (paid invoices)",
        format_money(stats.total_revenue, ctx.symbol())
    );
    println!("Clients:          {}", stats.active_clients);

    Ok(())
}

// Table row structs for tabled
#[derive(Tabled)]
struct CompanyRow {
    #[tabled(rename = "NAME")]
    name: String,
    #[tabled(rename = "TAX ID")]
    tax_id: String,
    #[tabled(rename = "EMAIL")]
    email: String,
    #[tabled(rename = "PHONE")]
    phone: String,
}

#[derive(Tabled)]
struct ClientRow {
    #[tabled(rename = "NAME")]
    name: String,
    #[tabled(rename = "COMPANY")]
    company: String,
    #[tabled(rename = "EMAIL")]
    email: String,
    #[tabled(rename = "PHONE")]
    phone: String,
}

#[derive(Tabled)]
struct InvoiceRow {
    #[tabled(rename = "#")]
    index: usize,
    #[tabled(rename = "NUMBER")]
    number: String,
    #[tabled(rename = "CLIENT")]
    client: String,
    #[tabled(rename = "COMPANY")]
    company: String,
    #[tabled(rename = "ISSUED")]
    issued: String,
    #[tabled(rename = "DUE")]
    due: String,
    #[tabled(rename = "TOTAL")]
    total: String,
    #[tabled(rename = "STATUS")]
    status: String,
}

#[derive(Tabled)]
struct ItemRow {
    #[tabled(rename = "#")]
    index: usize,
    #[tabled(rename = "DESCRIPTION")]
    description: String,
    #[tabled(rename = "QTY")]
    quantity: f64,
    #[tabled(rename = "PRICE")]
    price: String,
    #[tabled(rename = "TAX")]
    tax: String,
    #[tabled(rename = "DISCOUNT")]
    discount: String,
    #[tabled(rename = "TOTAL")]
    total: String,
}

fn date_or_dash(date: Option<NaiveDate>) -> String {
    date.map_or_else(|| "-".to_string(), |d| d.to_string())
}

/// List your companies
fn cmd_companies(ctx: &Context) -> Result<()> {
    let conn = ctx.connect()?;
    let (store, session) = conn.onboarded()?;

    let companies = list_companies(store, session.user.id).unwrap_or_else(|e| {
        error!(error = %e, "error fetching companies");
        Vec::new()
    });
    if companies.is_empty() {
        println!("No companies yet.");
        return Ok(());
    }

    let rows: Vec<CompanyRow> = companies
        .into_iter()
        .map(|c| CompanyRow {
            name: c.name,
            tax_id: c.tax_id,
            email: c.email,
            phone: c.phone,
        })
        .collect();

    let table = Table::new(rows).with(Style::rounded()).to_string();
    println!("{table}");
    Ok(())
}

fn cmd_add_company(ctx: &Context, company: NewCompany) -> Result<()> {
    let conn = ctx.connect()?;
    let (store, session) = conn.onboarded()?;

    let created = create_company(store, session.user.id, &company).inspect_err(|e| {
        error!(error = %e, "error creating company");
    })?;
    println!("Created company {}", created.name);
    Ok(())
}

/// List clients of your companies
fn cmd_clients(ctx: &Context) -> Result<()> {
    let conn = ctx.connect()?;
    let (store, session) = conn.onboarded()?;

    let companies = list_companies(store, session.user.id).unwrap_or_else(|e| {
        error!(error = %e, "error fetching companies");
        Vec::new()
    });
    let ids: Vec<_> = companies.iter().map(|c| c.id).collect();
    let clients = list_clients(store, &ids).unwrap_or_else(|e| {
        error!(error = %e, "error fetching clients");
        Vec::new()
    });

    if clients.is_empty() {
        println!("No clients yet.");
        println!("  invoicetree clients add --name <client>");
        return Ok(());
    }

    let rows: Vec<ClientRow> = clients
        .into_iter()
        .map(|c| ClientRow {
            company: companies
                .iter()
                .find(|co| co.id == c.company_id)
                .map(|co| co.name.clone())
                .unwrap_or_default(),
            name: c.name,
            email: c.email,
            phone: c.phone,
        })
        .collect();

    let table = Table::new(rows).with(Style::rounded()).to_string();
    println!("{table}");
    Ok(())
}

fn cmd_add_client(ctx: &Context, company: Option<&str>, client: NewClient) -> Result<()> {
    let conn = ctx.connect()?;
    let (store, session) = conn.onboarded()?;

    let companies = list_companies(store, session.user.id)?;
    let company = find_company(&companies, company)?;
    let created = create_client(store, company.id, &client).inspect_err(|e| {
        error!(error = %e, "error creating client");
    })?;
    println!("Created client {} for {}", created.name, company.name);
    Ok(())
}

/// Fetch the user's invoices, newest first. Failures fall back to an empty list.
fn fetch_invoices(store: &RestStore, session: &Session) -> Vec<Invoice> {
    company_ids(store, session.user.id)
        .and_then(|ids| list_invoices(store, &ids))
        .unwrap_or_else(|e| {
            error!(error = %e, "error fetching invoices");
            Vec::new()
        })
}

/// List invoices, newest first
fn cmd_invoices(ctx: &Context) -> Result<()> {
    let conn = ctx.connect()?;
    let (store, session) = conn.onboarded()?;

    let invoices = fetch_invoices(store, session);
    if invoices.is_empty() {
        println!("No invoices yet.");
        println!("  invoicetree invoices new --client <client> --item <desc>:<qty>:<price>");
        return Ok(());
    }

    let rows: Vec<InvoiceRow> = invoices
        .iter()
        .enumerate()
        .map(|(idx, inv)| InvoiceRow {
            index: idx + 1,
            number: inv.number.clone(),
            client: inv.client_name().to_string(),
            company: inv.company_name().to_string(),
            issued: date_or_dash(inv.issue_date),
            due: date_or_dash(inv.due_date),
            total: format_money(inv.total, ctx.symbol()),
            status: inv.status.to_string(),
        })
        .collect();

    let table = Table::new(rows).with(Style::rounded()).to_string();
    println!("{table}");
    println!();
    println!("Total: {} invoices", invoices.len());
    println!("Use the index with show/edit/status/delete/render (e.g., 'invoicetree invoices show 1')");
    Ok(())
}

fn cmd_show_invoice(ctx: &Context, reference: &str) -> Result<()> {
    let conn = ctx.connect()?;
    let (store, session) = conn.onboarded()?;

    let invoices = fetch_invoices(store, session);
    let invoice = resolve_invoice(&invoices, reference)?;
    let items = get_items(store, invoice.id)?;
    let symbol = ctx.symbol();

    println!("Invoice {}", invoice.number);
    println!("{}", "-".repeat(50));
    println!("Status:   {}", invoice.status);
    println!("Company:  {}", invoice.company_name());
    println!("Client:   {}", invoice.client_name());
    println!("Issued:   {}", date_or_dash(invoice.issue_date));
    println!("Due:      {}", date_or_dash(invoice.due_date));
    if !invoice.payment_terms.is_empty() {
        println!("Terms:    {}", invoice.payment_terms);
    }

    let rows: Vec<ItemRow> = items
        .iter()
        .enumerate()
        .map(|(idx, item)| ItemRow {
            index: idx + 1,
            description: item.description.clone(),
            quantity: item.quantity,
            price: format_money(item.unit_price, symbol),
            tax: format!("{}%", item.tax_rate),
            discount: format!("{}%", item.discount_rate),
            total: format_money(item.total, symbol),
        })
        .collect();
    println!();
    println!("{}", Table::new(rows).with(Style::rounded()));

    println!();
    println!("Subtotal: {}", format_money(invoice.subtotal, symbol));
    println!("Tax:      {}", format_money(invoice.tax_total, symbol));
    println!("Discount: -{}", format_money(invoice.discount_total, symbol));
    println!("Total:    {}", format_money(invoice.total, symbol));
    if !invoice.notes.is_empty() {
        println!();
        println!("Notes: {}", invoice.notes);
    }
    Ok(())
}

fn parse_date(value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .map_err(|_| InvoiceError::InvalidDate(value.to_string()))
}

fn parse_items(inputs: &[String]) -> Result<Vec<LineItemInput>> {
    inputs.iter().map(|s| parse_item_input(s)).collect()
}

fn cmd_new_invoice(
    ctx: &Context,
    client_ref: &str,
    company_ref: Option<&str>,
    fields: InvoiceFields,
) -> Result<()> {
    if fields.item.is_empty() {
        return Err(InvoiceError::NoItems);
    }
    let items = parse_items(&fields.item)?;
    let issue_date = match &fields.issue_date {
        Some(s) => parse_date(s)?,
        None => Local::now().date_naive(),
    };
    let due_date = match &fields.due_date {
        Some(s) => parse_date(s)?,
        None => issue_date
            .checked_add_days(Days::new(u64::from(ctx.settings.due_days)))
            .ok_or_else(|| {
                InvoiceError::Validation(format!(
                    "due_days {} puts the due date out of range; run 'invoicetree settings set due_days <days>'",
                    ctx.settings.due_days
                ))
            })?,
    };

    let conn = ctx.connect()?;
    let (store, session) = conn.onboarded()?;

    let companies = list_companies(store, session.user.id)?;
    let company = find_company(&companies, company_ref)?;
    let clients = list_clients(store, &[company.id])?;
    let client = find_client(&clients, company.id, client_ref)?;

    let number = match fields.number {
        Some(n) => n,
        None => next_invoice_number(store, company.id, &ctx.settings.number_format, issue_date)?,
    };

    let draft = InvoiceDraft {
        company_id: company.id,
        client_id: client.id,
        number,
        issue_date,
        due_date: Some(due_date),
        notes: fields
            .notes
            .unwrap_or_else(|| ctx.settings.default_notes.clone()),
        terms: fields
            .terms
            .unwrap_or_else(|| ctx.settings.default_terms.clone()),
        payment_terms: fields
            .payment_terms
            .unwrap_or_else(|| ctx.settings.default_payment_terms.clone()),
        items,
    };

    let invoice = create_invoice(store, &draft).inspect_err(|e| {
        error!(error = %e, "error saving invoice");
    })?;

    println!("Created {}", invoice.number);
    println!("  Client: {}", client.name);
    println!("  Items:  {}", draft.items.len());
    println!("  Total:  {}", format_money(invoice.total, ctx.symbol()));
    Ok(())
}

fn cmd_edit_invoice(
    ctx: &Context,
    reference: &str,
    client_ref: Option<&str>,
    fields: InvoiceFields,
) -> Result<()> {
    let new_items = if fields.item.is_empty() {
        None
    } else {
        Some(parse_items(&fields.item)?)
    };

    let conn = ctx.connect()?;
    let (store, session) = conn.onboarded()?;

    let invoices = fetch_invoices(store, session);
    let invoice = resolve_invoice(&invoices, reference)?;
    let existing_items = get_items(store, invoice.id)?;
    let mut draft = InvoiceDraft::from_existing(invoice, &existing_items)?;

    if let Some(items) = new_items {
        draft.items = items;
    }
    if let Some(client_ref) = client_ref {
        let clients = list_clients(store, &[invoice.company_id])?;
        draft.client_id = find_client(&clients, invoice.company_id, client_ref)?.id;
    }
    if let Some(number) = fields.number {
        draft.number = number;
    }
    if let Some(s) = &fields.issue_date {
        draft.issue_date = parse_date(s)?;
    }
    if let Some(s) = &fields.due_date {
        draft.due_date = Some(parse_date(s)?);
    }
    if let Some(notes) = fields.notes {
        draft.notes = notes;
    }
    if let Some(terms) = fields.terms {
        draft.terms = terms;
    }
    if let Some(payment_terms) = fields.payment_terms {
        draft.payment_terms = payment_terms;
    }

    let totals = update_invoice(store, invoice, &draft).inspect_err(|e| {
        error!(error = %e, "error saving invoice");
    })?;

    println!("Updated {}", draft.number);
    println!("  Items:  {}", draft.items.len());
    println!("  Total:  {}", format_money(totals.total, ctx.symbol()));
    Ok(())
}

fn cmd_set_status(ctx: &Context, reference: &str, status: &str) -> Result<()> {
    let status = InvoiceStatus::from(status.trim().to_lowercase());
    if status.as_str().is_empty() {
        return Err(InvoiceError::Validation("Status is required".to_string()));
    }

    let conn = ctx.connect()?;
    let (store, session) = conn.onboarded()?;

    let invoices = fetch_invoices(store, session);
    let invoice = resolve_invoice(&invoices, reference)?;
    set_status(store, invoice, &status)?;

    println!("Marked {} as {}", invoice.number, status);
    Ok(())
}

fn confirm(prompt: &str) -> Result<bool> {
    eprint!("{prompt} [y/N] ");
    io::stderr().flush()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(matches!(line.trim().to_lowercase().as_str(), "y" | "yes"))
}

fn cmd_delete_invoice(ctx: &Context, reference: &str, yes: bool) -> Result<()> {
    let conn = ctx.connect()?;
    let (store, session) = conn.onboarded()?;

    let invoices = fetch_invoices(store, session);
    let invoice = resolve_invoice(&invoices, reference)?;

    if !yes && !confirm(&format!("Delete invoice {}?", invoice.number))? {
        println!("Kept {}", invoice.number);
        return Ok(());
    }

    delete_invoice(store, invoice).inspect_err(|e| {
        error!(error = %e, "error deleting invoice");
    })?;
    println!("Deleted {}", invoice.number);
    Ok(())
}

fn cmd_render_invoice(
    ctx: &Context,
    reference: &str,
    output: Option<PathBuf>,
    open: bool,
) -> Result<()> {
    let conn = ctx.connect()?;
    let (store, session) = conn.onboarded()?;

    let invoices = fetch_invoices(store, session);
    let invoice = resolve_invoice(&invoices, reference)?;
    let document = load_document(store, invoice, ctx.symbol())?;

    let pdf_path = match output {
        Some(path) => path,
        None => {
            let output_dir = resolve_output_dir(&ctx.config.pdf.output_dir, &ctx.cfg_dir);
            std::fs::create_dir_all(&output_dir)?;
            output_dir.join(format!("{}.pdf", invoice.number.replace(['/', '\\'], "-")))
        }
    };

    generate_pdf(&document, &pdf_path)?;
    println!("Rendered {}", invoice.number);
    println!("  Saved: {}", pdf_path.display());

    if open {
        open_path(&pdf_path)?;
    }
    Ok(())
}

fn open_path(pdf_path: &Path) -> Result<()> {
    #[cfg(target_os = "macos")]
    {
        std::process::Command::new("open").arg(pdf_path).spawn()?;
    }

    #[cfg(target_os = "linux")]
    {
        std::process::Command::new("xdg-open").arg(pdf_path).spawn()?;
    }

    #[cfg(target_os = "windows")]
    {
        std::process::Command::new("cmd")
            .args(["/C", "start", ""])
            .arg(pdf_path)
            .spawn()?;
    }
    Ok(())
}

fn cmd_settings(ctx: &Context) -> Result<()> {
    let s = &ctx.settings;
    println!("Settings");
    println!("{}", "-".repeat(50));
    println!("default_currency:      {}", s.default_currency);
    println!("default_payment_terms: {}", s.default_payment_terms);
    println!("default_notes:         {}", s.default_notes);
    println!("default_terms:         {}", s.default_terms);
    println!("email_notifications:   {}", s.email_notifications);
    println!("number_format:         {}", s.number_format);
    println!("due_days:              {}", s.due_days);
    println!();
    println!("Stored in {}/settings.toml (local only)", ctx.cfg_dir.display());
    Ok(())
}

fn cmd_set_setting(ctx: &Context, key: &str, value: &str) -> Result<()> {
    let mut settings = ctx.settings.clone();
    settings.set(key, value)?;
    settings.save(&ctx.cfg_dir)?;
    println!("Saved {key}");
    Ok(())
}

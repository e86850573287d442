use clap::{Args, Parser, Subcommand};
use anyhow::{anyhow, Context, Result};
use tracing_subscriber::EnvFilter;
use zeroize::Zeroizing;

use minibiz::backup::{slugify, BackupStore};
use minibiz::blockhash;
use minibiz::business::Business;
use minibiz::concerns::{
    Concern, ConcernInputs, Couponization, Gamification, Governance, Identification,
    PaymentProcessing, SupplyChainSale, Tokenization,
};
use minibiz::config::{self, Config, EMBEDDED_CONFIG};
use minibiz::crypto;
use minibiz::contract::{ContractEnvelope, DigitalContract};
use minibiz::identity::Identity;
use minibiz::keys::PublicKey;
use minibiz::product::{example_products, Product};
use minibiz::prompt::Prompter;
use minibiz::qr::{PngQrRenderer, QrRenderer};

type Terminal = Prompter<std::io::StdinLock<'static>, std::io::Stdout>;

#[derive(Parser)]
#[command(author, version, about = "minibiz - digital business contracts for small companies")]
struct Cli {
    #[arg(short, long, default_value = "config.toml", global = true)]
    config: String,

    /// Verbose output (debug-level logs)
    #[arg(short, long, default_value_t = false, global = true)]
    debug: bool,

    /// Suppress the summary printed after each command
    #[arg(long, default_value_t = false, global = true)]
    quiet: bool,

    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Args)]
struct BusinessArgs {
    /// Business name (prompted when omitted)
    #[arg(short, long)]
    name: Option<String>,

    /// Business password (falls back to MINIBIZ_PASSWORD, then a prompt)
    #[arg(short, long)]
    password: Option<String>,
}

#[derive(Subcommand)]
enum Cmd {
    #[command(flatten)]
    Business(BusinessCmd),
    /// Print the Bitcoin genesis block hash
    Genesis,
}

#[derive(Subcommand)]
enum BusinessCmd {
    /// Create a digital business, or add identities and products to an existing one
    Create {
        #[command(flatten)]
        business: BusinessArgs,
        /// Identity to add, as NAME=ALIAS (repeatable)
        #[arg(long = "identity", value_name = "NAME=ALIAS")]
        identities: Vec<String>,
        /// Password for the identity at the same position (repeatable)
        #[arg(long = "identity-password")]
        identity_passwords: Vec<String>,
        /// Catalogue entry, as SKU:NAME:COUNT:PRICE (repeatable)
        #[arg(long = "product", value_name = "SKU:NAME:COUNT:PRICE")]
        products: Vec<Product>,
    },
    /// Link every identity's account to a namespace named after its alias
    Identify {
        #[command(flatten)]
        business: BusinessArgs,
        /// Identity passwords in identity order, comma separated
        #[arg(long, value_delimiter = ',')]
        passwords: Vec<String>,
    },
    /// Convert the governor account to a multisig co-signed by the identities
    Govern {
        #[command(flatten)]
        business: BusinessArgs,
    },
    /// Tokenise the product catalogue
    Tokenise {
        #[command(flatten)]
        business: BusinessArgs,
        /// Sign the contract offline with the governor key and print its hash
        #[arg(long, default_value_t = false)]
        sign: bool,
    },
    /// Reward an employee
    Reward {
        #[command(flatten)]
        business: BusinessArgs,
        #[arg(short, long)]
        employee: Option<String>,
    },
    /// Create a price-quote coupon for a product
    Couponise {
        #[command(flatten)]
        business: BusinessArgs,
        #[arg(short, long)]
        sku: Option<String>,
        #[arg(short, long)]
        quantity: Option<u64>,
    },
    /// Create a payment request for a product
    AcceptPayment {
        #[command(flatten)]
        business: BusinessArgs,
        #[arg(short, long)]
        sku: Option<String>,
    },
    /// Track the sale of one tokenized product through a transporter
    Sell {
        #[command(flatten)]
        business: BusinessArgs,
        #[arg(short, long)]
        sku: Option<String>,
        /// Full name of the identity transporting the product
        #[arg(short, long)]
        transporter: Option<String>,
        /// Customer public key (hex); a fresh key is generated when omitted
        #[arg(long)]
        customer: Option<String>,
    },
}

/// Everything a command needs besides its own flags.
struct Session {
    cfg: Config,
    envelope: ContractEnvelope,
    prompter: Terminal,
    quiet: bool,
    debug: bool,
}

impl Session {
    fn say(&self, line: impl AsRef<str>) {
        if !self.quiet {
            println!("{}", line.as_ref());
        }
    }

    fn business_name(&mut self, args: &BusinessArgs) -> Result<String> {
        Ok(self.prompter.text("Enter the company name", args.name.clone())?)
    }

    fn business_password(&mut self, args: &BusinessArgs) -> Result<Zeroizing<String>> {
        Ok(self
            .prompter
            .password("Enter the password for this digital business", args.password.clone())?)
    }

    fn open_store(&self, name: &str) -> Result<BackupStore> {
        let store = BackupStore::open(&self.cfg.storage.path, name)
            .with_context(|| format!("🗄️  couldn’t open backup for '{name}'"))?;
        tracing::debug!(path = %store.file_path().display(), "using data file");
        Ok(store)
    }

    /// Opens an existing business and checks the governor password.
    fn unlock(&mut self, args: &BusinessArgs) -> Result<(BackupStore, Zeroizing<String>)> {
        let name = self.business_name(args)?;
        let password = self.business_password(args)?;
        let store = self.open_store(&name)?;
        let business = store.business().ok_or_else(|| {
            anyhow!("Cannot find digital business '{name}'. Please, run the \"create\" command first.")
        })?;
        business.unlock_governor(&password).context("🔐  governor unlock failed")?;
        Ok((store, password))
    }

    fn inputs(&self) -> ConcernInputs {
        ConcernInputs::new(self.envelope.clone())
    }

    /// Renders the contract as a QR request and stores it once per name.
    fn save_contract(&self, store: &BackupStore, name: &str, contract: &DigitalContract) -> Result<()> {
        let mut path = store.artifact_path(name);
        if !path.exists() {
            let request = contract.request(&self.envelope.generation_hash)?;
            let image = PngQrRenderer::default().render_base64(&request)?;
            path = store.save_artifact(name, &image)?;
        }
        self.say("");
        self.say(format!("📄 Digital Contract located at: {}", path.display()));
        Ok(())
    }

    fn print_request(&self, contract: &DigitalContract) -> Result<()> {
        let request = contract.request(&self.envelope.generation_hash)?;
        self.say(format!("🧾 Unsigned contract with {} operation(s):", contract.len()));
        self.say(request.to_json()?);
        Ok(())
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if cli.debug { "debug" } else { "warn" }));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.cmd {
        Cmd::Genesis => {
            println!("{}", blockhash::genesis_block_hash()?);
            Ok(())
        }
        Cmd::Business(cmd) => {
            let cfg = load_config(&cli.config)?;
            let envelope = cfg.envelope()?;
            let mut session = Session {
                cfg,
                envelope,
                prompter: Prompter::stdio(),
                quiet: cli.quiet,
                debug: cli.debug,
            };
            run(&mut session, cmd)
        }
    }
}

fn run(session: &mut Session, cmd: BusinessCmd) -> Result<()> {
    match cmd {
        BusinessCmd::Create { business, identities, identity_passwords, products } => {
            create(session, &business, &identities, identity_passwords, products)
        }
        BusinessCmd::Identify { business, passwords } => identify(session, &business, passwords),
        BusinessCmd::Govern { business } => govern(session, &business),
        BusinessCmd::Tokenise { business, sign } => tokenise(session, &business, sign),
        BusinessCmd::Reward { business, employee } => reward(session, &business, employee),
        BusinessCmd::Couponise { business, sku, quantity } => couponise(session, &business, sku, quantity),
        BusinessCmd::AcceptPayment { business, sku } => accept_payment(session, &business, sku),
        BusinessCmd::Sell { business, sku, transporter, customer } => {
            sell(session, &business, sku, transporter, customer)
        }
    }
}

/// CLI path first, then the executable directory, else the embedded default.
fn load_config(path: &str) -> Result<Config> {
    match config::load(path) {
        Ok(c) => Ok(c),
        Err(e1) => {
            let candidate = std::env::current_exe()
                .ok()
                .and_then(|p| p.parent().map(|d| d.join("config.toml")));
            if let Some(candidate) = candidate {
                if let Ok(c) = config::load(&candidate) {
                    return Ok(c);
                }
            }
            tracing::warn!("⚠️  could not read config from '{}': {:#}; using embedded defaults", path, e1);
            config::load_from_str(EMBEDDED_CONFIG)
                .map_err(|e2| anyhow!("failed to load configuration: {} / {}", e1, e2))
        }
    }
}

fn create(
    session: &mut Session,
    args: &BusinessArgs,
    identities: &[String],
    identity_passwords: Vec<String>,
    products: Vec<Product>,
) -> Result<()> {
    let name = session.business_name(args)?;
    let password = session.business_password(args)?;
    let mut store = session.open_store(&name)?;
    if let Some(business) = store.business() {
        business.unlock_governor(&password).context("🔐  governor unlock failed")?;
    }

    let mut passwords = identity_passwords.into_iter();
    let mut new_identities = Vec::new();
    for entry in identities {
        let (id_name, alias) = entry
            .split_once('=')
            .ok_or_else(|| anyhow!("identity '{entry}' must be given as NAME=ALIAS"))?;
        let id_password = identity_password(session, id_name, passwords.next(), &password)?;
        new_identities.push(Identity::create(id_name.trim(), alias.trim(), id_password, session.cfg.kdf)?);
    }

    match store.business_mut() {
        Some(business) => {
            for identity in new_identities {
                business.add_identity(identity)?;
            }
        }
        None => {
            if identities.is_empty() && session.prompter.is_interactive() {
                new_identities = prompt_identities(session, &password)?;
            }
            let governor = Identity::create("governor", "governor", password.clone(), session.cfg.kdf)?;
            let business = Business::new(name.clone(), governor, new_identities, Vec::new(), session.debug)?;
            store.set_business(business);
            tracing::info!(business = %name, "digital business created");
        }
    }

    let catalogue_empty = store.business().map_or(true, |b| b.products().is_empty());
    let products = if products.is_empty() && catalogue_empty && session.prompter.is_interactive() {
        prompt_products(session)?
    } else {
        products
    };
    let business = store
        .business_mut()
        .ok_or_else(|| anyhow!("digital business misconfiguration"))?;
    for product in products {
        business.add_product(product)?;
    }

    let path = store.save()?;
    let business = store
        .business()
        .ok_or_else(|| anyhow!("digital business misconfiguration"))?;
    session.say("");
    session.say(format!("🗄️  Your digital business is located at: {}", path.display()));
    session.say("");
    session.say(format!("👑 Business governor: {}", business.governor().public_key()));
    for identity in business.identities() {
        session.say(format!(
            "🪪 Digital identity for \"{}\" (public): {}",
            identity.name(),
            identity.public_key()
        ));
    }
    for product in business.products() {
        session.say(format!(
            "📦 {} {} x{} @ {}",
            product.sku, product.name, product.count, product.price
        ));
    }
    Ok(())
}

/// Flag value, else a prompt on a terminal, else the business password.
fn identity_password(
    session: &mut Session,
    name: &str,
    flag: Option<String>,
    fallback: &Zeroizing<String>,
) -> Result<Zeroizing<String>> {
    if flag.is_none() && !session.prompter.is_interactive() {
        return Ok(fallback.clone());
    }
    Ok(session
        .prompter
        .secret(&format!("Enter the password for identity '{name}'"), flag, None)?)
}

fn prompt_identities(session: &mut Session, fallback: &Zeroizing<String>) -> Result<Vec<Identity>> {
    let mut identities = Vec::new();
    while session.prompter.confirm("Do you want to set up an identity?", false)? {
        let n = identities.len() + 1;
        let name = session
            .prompter
            .text(&format!("Enter a name (i.e. a full name) for identity #{n}"), None)?;
        let alias = session
            .prompter
            .text(&format!("Enter an alias (i.e. a nickname) for identity #{n}"), None)?;
        let password = identity_password(session, &name, None, fallback)?;
        identities.push(Identity::create(name, alias, password, session.cfg.kdf)?);
    }
    Ok(identities)
}

/// The example catalogue, or products typed one by one.
fn prompt_products(session: &mut Session) -> Result<Vec<Product>> {
    if session.prompter.confirm("Do you want to use the example product catalogue?", false)? {
        return Ok(example_products());
    }
    Ok(session.prompter.products()?)
}

fn identify(session: &mut Session, args: &BusinessArgs, passwords: Vec<String>) -> Result<()> {
    let (store, password) = session.unlock(args)?;
    let business = store
        .business()
        .ok_or_else(|| anyhow!("digital business misconfiguration"))?;

    let mut flags = passwords.into_iter();
    let mut resolved = Vec::with_capacity(business.identities().len());
    for identity in business.identities() {
        resolved.push(identity_password(session, identity.name(), flags.next(), &password)?);
    }

    let inputs = session.inputs().with_passwords(resolved);
    let concern = Identification::new(business.identities());
    let contract = business.dispatch(&concern, &inputs)?;
    session.print_request(&contract)
}

fn govern(session: &mut Session, args: &BusinessArgs) -> Result<()> {
    let (store, _) = session.unlock(args)?;
    let business = store
        .business()
        .ok_or_else(|| anyhow!("digital business misconfiguration"))?;
    let concern = Governance::new(business.governor(), business.identities());
    let contract = business.dispatch(&concern, &session.inputs())?;
    session.print_request(&contract)
}

fn tokenise(session: &mut Session, args: &BusinessArgs, sign: bool) -> Result<()> {
    let (mut store, password) = session.unlock(args)?;
    let business = store
        .business()
        .ok_or_else(|| anyhow!("digital business misconfiguration"))?;
    let concern = Tokenization::new(business.governor(), business.products());
    let contract = business.dispatch(&concern, &session.inputs())?;
    session.print_request(&contract)?;

    if sign {
        let key = business.unlock_governor(&password)?;
        let signed = contract.clone().sign(&key, &session.envelope.generation_hash)?;
        if !signed.verify(&session.envelope.generation_hash)? {
            return Err(anyhow!("offline signature did not verify"));
        }
        session.say(format!("✍️  Signed contract hash: {}", signed.hash));
    }

    store
        .business_mut()
        .ok_or_else(|| anyhow!("digital business misconfiguration"))?
        .assign_token_ids(&contract)?;
    store.save()?;
    if let Some(business) = store.business() {
        for product in business.products() {
            session.say(format!(
                "🪙 {} tokenised as {}",
                product.sku,
                product.token_id.as_deref().unwrap_or("-")
            ));
        }
    }
    Ok(())
}

fn reward(session: &mut Session, args: &BusinessArgs, employee: Option<String>) -> Result<()> {
    let (store, _) = session.unlock(args)?;
    let employee = session
        .prompter
        .text("Enter the full name of the employee to reward", employee)?;
    let business = store
        .business()
        .ok_or_else(|| anyhow!("digital business misconfiguration"))?;
    let concern = Gamification::new(business.governor(), business.find_identity(&employee)?);
    run_artifact(session, &store, business, &concern, &format!("Reward-{}", slugify(&employee)))
}

fn couponise(
    session: &mut Session,
    args: &BusinessArgs,
    sku: Option<String>,
    quantity: Option<u64>,
) -> Result<()> {
    let (store, _) = session.unlock(args)?;
    let sku = session.prompter.text("Enter the product SKU", sku)?;
    let quantity = match quantity {
        Some(q) => q,
        None => session
            .prompter
            .text("Enter the quantity", None)?
            .parse()
            .context("quantity must be a whole number")?,
    };
    let business = store
        .business()
        .ok_or_else(|| anyhow!("digital business misconfiguration"))?;
    let concern = Couponization::new(business.governor(), business.find_product(&sku)?, quantity);
    run_artifact(session, &store, business, &concern, &format!("Couponise-{}", slugify(&sku)))
}

fn accept_payment(session: &mut Session, args: &BusinessArgs, sku: Option<String>) -> Result<()> {
    let (store, _) = session.unlock(args)?;
    let sku = session.prompter.text("Enter the product SKU", sku)?;
    let business = store
        .business()
        .ok_or_else(|| anyhow!("digital business misconfiguration"))?;
    let concern = PaymentProcessing::new(business.governor(), business.find_product(&sku)?);
    run_artifact(session, &store, business, &concern, &format!("Payment-{}", slugify(&sku)))
}

fn sell(
    session: &mut Session,
    args: &BusinessArgs,
    sku: Option<String>,
    transporter: Option<String>,
    customer: Option<String>,
) -> Result<()> {
    let (store, _) = session.unlock(args)?;
    let sku = session.prompter.text("Enter the product SKU", sku)?;
    let transporter = session
        .prompter
        .text("Enter the full name of the transporter", transporter)?;
    let customer = match customer {
        Some(hex) => PublicKey::from_hex(&hex)?,
        None => PublicKey::from(&ed25519_dalek::SigningKey::from_bytes(&crypto::random_bytes())),
    };
    let business = store
        .business()
        .ok_or_else(|| anyhow!("digital business misconfiguration"))?;
    let concern = SupplyChainSale::new(
        business.governor(),
        business.find_identity(&transporter)?,
        customer,
        business.find_product(&sku)?,
    );
    let contract = business.dispatch(&concern, &session.inputs())?;
    session.say(format!("🚚 Sale of one {sku} to customer {customer}"));
    session.print_request(&contract)
}

fn run_artifact(
    session: &Session,
    store: &BackupStore,
    business: &Business,
    concern: &dyn Concern,
    name: &str,
) -> Result<()> {
    let contract = business.dispatch(concern, &session.inputs())?;
    session.save_contract(store, name, &contract)
}

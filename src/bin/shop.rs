//! Terminal client: keeps the local session file and drives the cart
//! directly against the database.
use std::{path::PathBuf, sync::Arc, time::Duration};

use anyhow::{Context, bail};
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use storefront::{
    cart::{CartManager, CheckoutPolicy, LineItemOutcome, cart_total},
    db::create_orm_conn,
    gateway::{
        CatalogGateway, OrderFilter, OrderGateway, ProductFilter, ProfileGateway, ProfilePatch,
        postgres::PgGateway,
    },
    middleware::auth::{issue_token, verify_token_for},
    models::{Product, ProductId},
    money::Money,
    session::{Session, SessionStore},
};

const TOKEN_TTL: Duration = Duration::from_secs(60 * 60 * 24 * 7);

#[derive(Debug, Parser)]
#[command(name = "shop", about = "Storefront terminal client", long_about = None)]
struct Cli {
    /// PostgreSQL connection string
    #[arg(long, env = "DATABASE_URL", hide_env_values = true, global = true)]
    database_url: Option<String>,

    /// Where the local session is kept
    #[arg(
        long,
        env = "SESSION_PATH",
        default_value = "./.storefront/session.json",
        global = true
    )]
    session_path: PathBuf,

    /// Delete the order again if its items cannot be saved
    #[arg(long, env = "CHECKOUT_COMPENSATE", global = true)]
    compensate: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Start a session for an existing profile
    Login(LoginArgs),
    /// Forget the local session
    Logout,
    /// Show the local session
    Whoami,
    /// Update profile fields in the database and the session
    Profile(ProfileArgs),
    /// Browse the catalog, best rated first
    Products(ProductsArgs),
    /// Add units of a product in a size
    Add(AddArgs),
    /// One more unit
    Plus(ItemArgs),
    /// One unit less
    Minus(ItemArgs),
    /// Show the cart with live prices
    Cart,
    /// Show the cart total
    Total,
    /// Remove every line from the cart
    Clear,
    /// Turn the cart into an order
    Checkout(CheckoutArgs),
    /// List my orders, newest first
    Orders,
}

#[derive(Debug, Args)]
struct LoginArgs {
    #[arg(long)]
    user_id: String,

    /// Token from the auth provider; minted locally when absent
    #[arg(long, env = "SHOP_TOKEN", hide_env_values = true)]
    token: Option<String>,

    #[arg(long, env = "JWT_SECRET", hide_env_values = true)]
    jwt_secret: Option<String>,
}

#[derive(Debug, Args)]
struct ProfileArgs {
    #[arg(long)]
    first_name: Option<String>,
    #[arg(long)]
    last_name: Option<String>,
    #[arg(long)]
    phone: Option<String>,
    #[arg(long)]
    address: Option<String>,
    #[arg(long)]
    email: Option<String>,
}

#[derive(Debug, Args)]
struct ProductsArgs {
    /// Title contains
    #[arg(long)]
    q: Option<String>,
    /// Category id
    #[arg(long)]
    brand: Option<i64>,
    #[arg(long, default_value_t = 20)]
    limit: u64,
}

#[derive(Debug, Args)]
struct AddArgs {
    #[arg(long)]
    product_id: ProductId,
    #[arg(long)]
    size: String,
    #[arg(long, default_value_t = 1)]
    quantity: i32,
}

#[derive(Debug, Args)]
struct ItemArgs {
    #[arg(long)]
    product_id: ProductId,
    #[arg(long)]
    size: String,
}

#[derive(Debug, Args)]
struct CheckoutArgs {
    /// Defaults to the address saved in the session
    #[arg(long)]
    address: Option<String>,
}

struct Shop {
    gateway: Arc<PgGateway>,
    carts: CartManager<PgGateway>,
    session: SessionStore,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let session = SessionStore::open(&cli.session_path)
        .await
        .with_context(|| format!("cannot open session {}", cli.session_path.display()))?;

    match cli.command {
        Commands::Logout => {
            session.clear_session().await?;
            println!("logged out");
            return Ok(());
        }
        Commands::Whoami => {
            print_session(&session);
            return Ok(());
        }
        _ => {}
    }

    let database_url = cli
        .database_url
        .context("DATABASE_URL is required for this command")?;
    let gateway = Arc::new(PgGateway::new(create_orm_conn(&database_url).await?));
    let policy = if cli.compensate {
        CheckoutPolicy::DeleteOrphan
    } else {
        CheckoutPolicy::KeepOrphan
    };
    let shop = Shop {
        carts: CartManager::new(gateway.clone()).with_policy(policy),
        gateway,
        session,
    };

    match cli.command {
        Commands::Login(args) => shop.login(args).await,
        Commands::Profile(args) => shop.update_profile(args).await,
        Commands::Products(args) => shop.products(args).await,
        Commands::Add(args) => {
            shop.change(args.product_id, &args.size, Change::Add(args.quantity))
                .await
        }
        Commands::Plus(args) => shop.change(args.product_id, &args.size, Change::Plus).await,
        Commands::Minus(args) => shop.change(args.product_id, &args.size, Change::Minus).await,
        Commands::Cart => shop.cart().await,
        Commands::Total => shop.total().await,
        Commands::Clear => shop.clear().await,
        Commands::Checkout(args) => shop.checkout(args).await,
        Commands::Orders => shop.orders().await,
        Commands::Logout | Commands::Whoami => Ok(()),
    }
}

enum Change {
    Add(i32),
    Plus,
    Minus,
}

impl Shop {
    fn user_id(&self) -> anyhow::Result<String> {
        match self.session.user_id() {
            Some(user_id) if self.session.is_logged_in() => Ok(user_id),
            _ => bail!("not logged in, run `shop login --user-id <id>` first"),
        }
    }

    async fn login(&self, args: LoginArgs) -> anyhow::Result<()> {
        let profile = self
            .gateway
            .find_profile(args.user_id.trim())
            .await?
            .with_context(|| format!("no profile for user {}", args.user_id))?;

        let token = match (args.token, args.jwt_secret) {
            (Some(token), None) => token,
            (Some(token), Some(secret)) => {
                verify_token_for(&secret, &token, &profile.user_id)
                    .map_err(|err| anyhow::anyhow!("{err}"))?;
                token
            }
            (None, Some(secret)) => issue_token(&secret, &profile.user_id, TOKEN_TTL)
                .map_err(|err| anyhow::anyhow!("{err}"))?,
            (None, None) => bail!("pass --token or set JWT_SECRET"),
        };

        let cart_id = self.carts.find_active_cart(&profile.user_id).await?;
        self.session
            .save_session(Session::from_profile(&token, &profile, cart_id))
            .await?;
        println!(
            "logged in as {}",
            self.session.user_name().unwrap_or(profile.user_id)
        );
        Ok(())
    }

    async fn update_profile(&self, args: ProfileArgs) -> anyhow::Result<()> {
        let user_id = self.user_id()?;
        let patch = ProfilePatch {
            first_name: args.first_name,
            last_name: args.last_name,
            phone: args.phone,
            address: args.address,
            email: args.email,
            is_admin: None,
        };
        let profile = self
            .gateway
            .update_profile(&user_id, patch)
            .await?
            .context("profile no longer exists")?;

        self.session.save_first_name(&profile.first_name).await?;
        self.session.save_last_name(&profile.last_name).await?;
        if let Some(phone) = &profile.phone {
            self.session.save_phone(phone).await?;
        }
        if let Some(address) = &profile.address {
            self.session.save_address(address).await?;
        }
        if let Some(email) = &profile.email {
            self.session.save_email(email).await?;
        }
        println!("profile updated");
        Ok(())
    }

    async fn products(&self, args: ProductsArgs) -> anyhow::Result<()> {
        let filter = ProductFilter {
            title_contains: args.q,
            brand: args.brand,
            limit: Some(args.limit),
            offset: None,
        };
        for product in self.gateway.list_products(&filter).await? {
            println!(
                "{:>6}  {:<32} {:>10}  sizes: {}",
                product.id,
                product.title.as_deref().unwrap_or("-"),
                Money::from_decimal(product.price),
                product.size.join(",")
            );
        }
        Ok(())
    }

    async fn change(&self, product_id: ProductId, size: &str, change: Change) -> anyhow::Result<()> {
        let user_id = self.user_id()?;
        let product = self.product(product_id).await?;
        let size = size.trim();

        let applied = match change {
            Change::Add(quantity) => {
                if quantity <= 0 {
                    bail!("quantity must be greater than 0");
                }
                self.carts
                    .add_product(&user_id, &product, quantity, size)
                    .await?
            }
            Change::Plus => self.carts.plus_item(&user_id, &product, size).await?,
            Change::Minus => self.carts.minus_item(&user_id, &product, size).await?,
        };

        self.session.save_cart_id(Some(applied.cart_id)).await?;

        match applied.outcome {
            LineItemOutcome::Inserted { quantity } | LineItemOutcome::Updated { quantity } => {
                println!("{} ({size}) x {quantity}", title(&product))
            }
            LineItemOutcome::Deleted => println!("{} ({size}) removed", title(&product)),
            LineItemOutcome::Unchanged => println!("{} ({size}) not in cart", title(&product)),
        }
        Ok(())
    }

    async fn cart(&self) -> anyhow::Result<()> {
        let user_id = self.user_id()?;
        let details = self.carts.list_cart_details(&user_id).await?;
        if details.is_empty() {
            println!("cart is empty");
            return Ok(());
        }
        for detail in &details {
            let unit = Money::from_decimal(detail.product.price);
            let line_total = detail.line_total().context("line total is too large")?;
            println!(
                "{:>6}  {:<32} {:>4} x {:>10} = {:>10}  ({})",
                detail.product_id,
                title(&detail.product),
                detail.quantity,
                unit,
                line_total,
                detail.size
            );
        }
        let total = cart_total(&details)?;
        println!("total: {total}");
        Ok(())
    }

    async fn total(&self) -> anyhow::Result<()> {
        let user_id = self.user_id()?;
        println!("{}", self.carts.get_total(&user_id).await?);
        Ok(())
    }

    async fn clear(&self) -> anyhow::Result<()> {
        let user_id = self.user_id()?;
        let removed = match self.carts.find_active_cart(&user_id).await? {
            Some(cart_id) => self.carts.clear_cart(cart_id).await?,
            None => 0,
        };
        println!("removed {removed} line(s)");
        Ok(())
    }

    async fn checkout(&self, args: CheckoutArgs) -> anyhow::Result<()> {
        let user_id = self.user_id()?;
        let address = args
            .address
            .or_else(|| self.session.address())
            .unwrap_or_default();

        let order = self.carts.checkout_cart(&user_id, &address).await?;
        self.session.save_cart_id(None).await?;
        println!(
            "order {} placed: {} to {} ({})",
            order.id, order.total_amount, order.address_shipping, order.status
        );
        Ok(())
    }

    async fn orders(&self) -> anyhow::Result<()> {
        let user_id = self.user_id()?;
        let filter = OrderFilter {
            user_id: Some(user_id),
            ..OrderFilter::default()
        };
        for order in self.gateway.list_orders(&filter).await? {
            println!(
                "{:>6}  {}  {:>10}  {:<10}  {}",
                order.id,
                order.created_at.format("%Y-%m-%d %H:%M"),
                order.total_amount,
                order.status,
                order.address_shipping
            );
        }
        Ok(())
    }

    async fn product(&self, id: ProductId) -> anyhow::Result<Product> {
        self.gateway
            .find_product(id)
            .await?
            .with_context(|| format!("product {id} not found"))
    }
}

fn title(product: &Product) -> &str {
    product.title.as_deref().unwrap_or("untitled")
}

fn print_session(session: &SessionStore) {
    if !session.is_logged_in() {
        println!("not logged in");
        return;
    }
    println!("user_id: {}", session.user_id().unwrap_or_default());
    if let Some(name) = session.user_name() {
        println!("name:    {name}");
    }
    if let Some(email) = session.email() {
        println!("email:   {email}");
    }
    if let Some(phone) = session.phone() {
        println!("phone:   {phone}");
    }
    if let Some(address) = session.address() {
        println!("address: {address}");
    }
    if session.is_admin() {
        println!("admin:   yes");
    }
    match session.cart_id() {
        Some(cart_id) => println!("cart:    {cart_id}"),
        None => println!("cart:    none"),
    }
}

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Result, bail};
use clap::{Parser, Subcommand};
use recipe_box::config::{DEFAULT_API_BASE_URL, DEFAULT_REQUEST_TIMEOUT_SECS};
use recipe_box::ingredient::format_count;
use recipe_box::search::RESULTS_PER_PAGE;
use recipe_box::{
    App, AppError, Config, ForkifyClient, MemoryStorage, Recipe, Search, ServingsDirection,
    ShoppingItem, SqliteStorage, Storage, logging, recipe_id_from_fragment,
};

#[derive(Parser)]
#[command(name = "recipe_box")]
#[command(author, version, about = "Search recipes, scale servings, keep favourites and a shopping list", long_about = None)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Database file (default: per-user data directory)
    #[arg(long, env = "RECIPE_BOX_DB", global = true)]
    db: Option<PathBuf>,

    /// Base URL of the recipe API
    #[arg(long, env = "RECIPE_BOX_API_URL", default_value = DEFAULT_API_BASE_URL, global = true)]
    api_url: String,

    /// Request timeout in seconds
    #[arg(long, default_value_t = DEFAULT_REQUEST_TIMEOUT_SECS, global = true)]
    timeout: u64,

    /// Keep favourites and the shopping list in memory only
    #[arg(long, global = true)]
    ephemeral: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Search recipes
    Search {
        query: String,
        /// Result page to show
        #[arg(short, long, default_value_t = 1)]
        page: usize,
    },
    /// Show a recipe by id (a leading '#' is accepted)
    Show {
        id: String,
        /// Scale ingredients to this many servings
        #[arg(short, long, value_parser = clap::value_parser!(u32).range(1..))]
        servings: Option<u32>,
    },
    /// Toggle a recipe in the favourites
    Like { id: String },
    /// Remove a recipe from the favourites without fetching it
    Unlike { id: String },
    /// List favourite recipes
    Favourites,
    /// Manage the shopping list
    #[command(subcommand)]
    List(ListCommands),
}

#[derive(Subcommand)]
enum ListCommands {
    /// Add every ingredient of a recipe
    AddRecipe {
        id: String,
        #[arg(short, long, value_parser = clap::value_parser!(u32).range(1..))]
        servings: Option<u32>,
    },
    /// Print the shopping list
    Show,
    /// Change the quantity of an item
    Update { item_id: String, count: f64 },
    /// Remove one item
    Remove { item_id: String },
    /// Remove every item
    Clear,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose)?;

    let mut config = Config::resolve(cli.db)?;
    config.api_base_url = cli.api_url;
    config.request_timeout = Duration::from_secs(cli.timeout);

    let storage: Arc<dyn Storage> = if cli.ephemeral {
        Arc::new(MemoryStorage::new())
    } else {
        Arc::new(SqliteStorage::open(&config.db_path)?)
    };
    let api = Arc::new(ForkifyClient::new(&config)?);
    let mut app = App::start(api, storage);

    match cli.command {
        Commands::Search { query, page } => {
            let outcome = app
                .control_search(&query)
                .await
                .map(|search| print_search(search, page));
            surface(&app, outcome)
        }
        Commands::Show { id, servings } => {
            load_recipe(&mut app, &id, servings).await?;
            if let Some(recipe) = app.recipe() {
                print_recipe(recipe, app.is_favourite());
            }
            Ok(())
        }
        Commands::Like { id } => {
            load_recipe(&mut app, &id, None).await?;
            if app.toggle_favourite()? {
                println!("Added to favourites.");
            } else {
                println!("Removed from favourites.");
            }
            println!("{} favourite(s).", app.favourites().count());
            Ok(())
        }
        Commands::Unlike { id } => {
            if app.unlike(&id)? {
                println!("Removed from favourites.");
            } else {
                println!("Recipe {id} is not a favourite.");
            }
            Ok(())
        }
        Commands::Favourites => {
            if app.favourites().count() == 0 {
                println!("No favourites yet.");
            }
            for item in app.favourites().items() {
                println!("{:>8}  {} ({})", item.id, item.title, item.author);
            }
            Ok(())
        }
        Commands::List(command) => run_list(&mut app, command).await,
    }
}

async fn run_list(app: &mut App, command: ListCommands) -> Result<()> {
    match command {
        ListCommands::AddRecipe { id, servings } => {
            load_recipe(app, &id, servings).await?;
            let added = app.add_recipe_to_shopping_list()?;
            println!("Added {} item(s).", added.len());
            print_shopping_list(app.shopping_list().items());
        }
        ListCommands::Show => print_shopping_list(app.shopping_list().items()),
        ListCommands::Update { item_id, count } => {
            if !app.update_shopping_item(&item_id, count)? {
                bail!("no shopping item with id {item_id}");
            }
            print_shopping_list(app.shopping_list().items());
        }
        ListCommands::Remove { item_id } => {
            if app.remove_shopping_item(&item_id)?.is_none() {
                bail!("no shopping item with id {item_id}");
            }
            print_shopping_list(app.shopping_list().items());
        }
        ListCommands::Clear => {
            app.clear_shopping_list()?;
            println!("Shopping list cleared.");
        }
    }
    Ok(())
}

async fn load_recipe(app: &mut App, fragment: &str, servings: Option<u32>) -> Result<()> {
    let Some(id) = recipe_id_from_fragment(fragment) else {
        bail!("recipe id must not be empty");
    };

    let outcome = app.control_recipe(id).await.map(|_| ());
    surface(app, outcome)?;

    if let Some(target) = servings {
        while let Some(current) = app.recipe().map(|recipe| recipe.servings) {
            let direction = match current.cmp(&target) {
                std::cmp::Ordering::Less => ServingsDirection::Increment,
                std::cmp::Ordering::Greater => ServingsDirection::Decrement,
                std::cmp::Ordering::Equal => break,
            };
            if !app.update_servings(direction)? {
                break;
            }
        }
    }
    Ok(())
}

/// Turn a failed flow into the user-facing notification recorded by the app.
fn surface(app: &App, outcome: Result<(), AppError>) -> Result<()> {
    match outcome {
        Ok(()) => Ok(()),
        Err(err) => match app.last_error() {
            Some(message) => bail!("{message}"),
            None => Err(err.into()),
        },
    }
}

fn print_search(search: &Search, page: usize) {
    let page = search.page(page, RESULTS_PER_PAGE);
    if page.items.is_empty() {
        println!("No recipes found for '{}'.", search.query());
        return;
    }

    for hit in page.items {
        println!("{:>8}  {} ({})", hit.id, hit.title, hit.author);
    }
    println!("Page {} of {}", page.page, page.total_pages);
}

fn print_recipe(recipe: &Recipe, favourite: bool) {
    let marker = if favourite { " [favourite]" } else { "" };
    println!("{}{marker}", recipe.title);
    println!("by {}", recipe.author);
    println!(
        "{} minutes, {} servings",
        recipe.cooking_time_minutes, recipe.servings
    );
    println!();
    for ingredient in &recipe.ingredients {
        let count = ingredient.count.map(format_count).unwrap_or_default();
        let line = [count.as_str(), ingredient.unit.as_str(), ingredient.ingredient.as_str()]
            .into_iter()
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        println!("  - {line}");
    }
    if !recipe.source_url.is_empty() {
        println!();
        println!("Directions: {}", recipe.source_url);
    }
}

fn print_shopping_list(items: &[ShoppingItem]) {
    if items.is_empty() {
        println!("Shopping list is empty.");
        return;
    }
    for item in items {
        let count = item.count.map(format_count).unwrap_or_default();
        println!("{}  {:>6} {:<6} {}", item.id, count, item.unit, item.ingredient);
    }
}

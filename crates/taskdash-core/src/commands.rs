use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, anyhow};
use chrono::Utc;
use tracing::{debug, info, instrument, warn};

use crate::auth::{AuthContext, AuthError};
use crate::cli::{Command, DashboardArgs, LoginArgs, MetaArgs};
use crate::config::Config;
use crate::dashboard::{DashboardController, DashboardSettings, MemoryNavigator, Phase};
use crate::datastore::MockDataStore;
use crate::render::Renderer;
use crate::seo::{self, Site};
use crate::sitemap;
use crate::url_state;
use crate::validation::LoginForm;

/// Everything a route needs, built once per invocation.
pub struct AppContext {
    pub cfg: Config,
    pub data_dir: PathBuf,
    pub renderer: Renderer,
    pub auth: AuthContext,
    pub site: Site,
}

impl AppContext {
    #[instrument(skip(cfg, data_dir))]
    pub fn open(cfg: Config, data_dir: PathBuf) -> anyhow::Result<Self> {
        let renderer = Renderer::new(&cfg)?;
        let site = Site::from_config(&cfg)?;
        let auth = AuthContext::open(&cfg, &data_dir)
            .with_context(|| format!("failed to open session storage in {}", data_dir.display()))?;

        Ok(Self {
            cfg,
            data_dir,
            renderer,
            auth,
            site,
        })
    }
}

#[instrument(skip(ctx, command))]
pub async fn dispatch(ctx: &AppContext, command: Command) -> anyhow::Result<()> {
    debug!(command = command.name(), "dispatching command");

    match command {
        Command::Home(args) => {
            info!("redirecting / to /dashboard");
            cmd_dashboard(ctx, args).await
        }
        Command::Login(args) => cmd_login(ctx, args).await,
        Command::Logout => cmd_logout(ctx),
        Command::Dashboard(args) => cmd_dashboard(ctx, args).await,
        Command::Profile => cmd_profile(ctx),
        Command::Categories => cmd_categories(ctx),
        Command::Meta(args) => cmd_meta(ctx, args),
        Command::Sitemap => {
            let xml = sitemap::sitemap_xml(&ctx.site, seo::ROUTES, Utc::now())?;
            print!("{xml}");
            Ok(())
        }
        Command::Robots => {
            print!("{}", sitemap::robots_txt(&ctx.site)?);
            Ok(())
        }
    }
}

async fn cmd_login(ctx: &AppContext, args: LoginArgs) -> anyhow::Result<()> {
    let form = LoginForm::new(args.email, args.password);

    match ctx.auth.submit(&form).await {
        Ok(user) => {
            println!("Signed in as {} <{}> ({})", user.name, user.email, user.role.label());
            Ok(())
        }
        Err(AuthError::Validation(errors)) => {
            let mut err = io::stderr().lock();
            for field in &errors.errors {
                writeln!(err, "{}: {}", field.field, field.message)?;
            }
            Err(anyhow!("login form is invalid"))
        }
        Err(err @ AuthError::InvalidCredentials) => Err(err.into()),
    }
}

fn cmd_logout(ctx: &AppContext) -> anyhow::Result<()> {
    let was_signed_in = ctx.auth.is_authenticated();
    ctx.auth.logout();
    if was_signed_in {
        println!("Signed out");
    } else {
        println!("No active session");
    }
    Ok(())
}

fn cmd_profile(ctx: &AppContext) -> anyhow::Result<()> {
    let user = ctx
        .auth
        .user()
        .ok_or_else(|| anyhow!("not signed in; run `taskdash login` first"))?;
    ctx.renderer.write_profile(&mut io::stdout().lock(), &user)
}

fn cmd_categories(ctx: &AppContext) -> anyhow::Result<()> {
    let store = MockDataStore::open(&ctx.cfg)?;
    let mut out = io::stdout().lock();
    for category in store.categories() {
        writeln!(out, "{category}")?;
    }
    Ok(())
}

fn cmd_meta(ctx: &AppContext, args: MetaArgs) -> anyhow::Result<()> {
    let metadata = seo::route_metadata(&ctx.site, &args.route)
        .ok_or_else(|| anyhow!("unknown route: {}", args.route))?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&metadata)?);
    } else {
        print!("{}", metadata.meta_tags()?);
    }
    Ok(())
}

#[instrument(skip(ctx, args))]
async fn cmd_dashboard(ctx: &AppContext, args: DashboardArgs) -> anyhow::Result<()> {
    let settings = DashboardSettings::from_config(&ctx.cfg)?;
    let location = seed_location(&args, &settings)?;
    let store = Arc::new(MockDataStore::open(&ctx.cfg)?);
    let navigator = Arc::new(MemoryNavigator::default());

    let controller = DashboardController::mount(
        store,
        ctx.auth.clone(),
        navigator.clone(),
        settings,
        &location,
    );
    let view = controller.settled().await?;
    let url = match navigator.current().as_deref() {
        Some("") | None => "/dashboard".to_string(),
        Some(query) => format!("/dashboard?{query}"),
    };

    if args.json {
        return match view.phase() {
            Phase::LoginRequired => Err(anyhow!("not signed in; run `taskdash login` first")),
            Phase::Failed(message) => Err(anyhow!("{message}")),
            _ => {
                let result = view
                    .result
                    .as_ref()
                    .ok_or_else(|| anyhow!("dashboard produced no result"))?;
                println!("{}", serde_json::to_string_pretty(result)?);
                Ok(())
            }
        };
    }

    if let Some(message) = view.error.as_deref() {
        warn!(error = %message, "dashboard fetch failed");
    }

    let mut out = io::stdout().lock();
    ctx.renderer
        .write_dashboard(&mut out, &view, &controller.categories(), Utc::now())?;
    writeln!(out)?;
    writeln!(out, "URL: {url}")?;
    Ok(())
}

/// Folds explicit flags over the `--url` query so the dashboard mounts with a single fetch.
fn seed_location(args: &DashboardArgs, settings: &DashboardSettings) -> anyhow::Result<String> {
    let mut snapshot = url_state::decode_with(&args.url, settings.defaults());
    let mut filters_changed = false;

    if let Some(search) = &args.search {
        snapshot.search = search.clone();
        filters_changed = true;
    }
    if let Some(status) = &args.status {
        snapshot.status = status.clone();
        filters_changed = true;
    }
    if let Some(priority) = &args.priority {
        snapshot.priority = priority.clone();
        filters_changed = true;
    }
    if let Some(category) = &args.category {
        snapshot.category = category.clone();
        filters_changed = true;
    }
    if let Some(page_size) = args.page_size {
        if page_size == 0 {
            return Err(anyhow!("--page-size must be at least 1"));
        }
        snapshot.page_size = page_size;
        filters_changed = true;
    }

    // Changing a filter starts over at page 1, as the setters do.
    if filters_changed {
        snapshot.page = 1;
    }
    if let Some(page) = args.page {
        if page == 0 {
            return Err(anyhow!("--page must be at least 1"));
        }
        snapshot.page = page;
    }

    Ok(url_state::encode_with(&snapshot, &settings.defaults()))
}

#[cfg(test)]
mod tests {
    use super::seed_location;
    use crate::cli::DashboardArgs;
    use crate::dashboard::DashboardSettings;
    use crate::filter::Choice;
    use crate::task::Status;

    #[test]
    fn flags_override_the_url_and_reset_the_page() {
        let args = DashboardArgs {
            url: "priority=high&page=3".to_string(),
            status: Some(Choice::Only(Status::Active)),
            ..DashboardArgs::default()
        };
        let location = seed_location(&args, &DashboardSettings::default()).unwrap();
        assert_eq!(location, "status=active&priority=high");
    }

    #[test]
    fn explicit_page_survives_filter_flags() {
        let args = DashboardArgs {
            page_size: Some(5),
            page: Some(2),
            ..DashboardArgs::default()
        };
        let location = seed_location(&args, &DashboardSettings::default()).unwrap();
        assert_eq!(location, "page=2&pageSize=5");
    }

    #[test]
    fn zero_page_or_page_size_flags_are_errors() {
        let args = DashboardArgs {
            page_size: Some(0),
            ..DashboardArgs::default()
        };
        assert!(seed_location(&args, &DashboardSettings::default()).is_err());

        let args = DashboardArgs {
            page_size: Some(500),
            ..DashboardArgs::default()
        };
        let location = seed_location(&args, &DashboardSettings::default()).unwrap();
        assert_eq!(location, "pageSize=500");

        let args = DashboardArgs {
            page: Some(0),
            ..DashboardArgs::default()
        };
        assert!(seed_location(&args, &DashboardSettings::default()).is_err());
    }
}

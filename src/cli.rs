use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;

use crate::{
  client::ContentScope,
  config::SiteConfig,
  pages::{
    RenderSettings,
    listing::{self, PostListing},
    post,
  },
  server::ServerConfig,
};

#[derive(Parser)]
#[clap(version, about)]
pub struct Cli {
  #[clap(subcommand)]
  subcmd: SubCommand,

  #[clap(long, short)]
  config: PathBuf,

  /// Content API access token, overrides `access_token` in the config
  #[clap(long, env = "PRISMIC_ACCESS_TOKEN", hide_env_values = true)]
  access_token: Option<String>,

  /// Secret for signing preview cookies, overrides `cookie_secret`
  #[clap(long, env = "PREVIEW_COOKIE_SECRET", hide_env_values = true)]
  cookie_secret: Option<String>,
}

#[derive(Parser)]
enum SubCommand {
  /// Serve the blog
  Server(ServerConfig),
  /// List the post paths rendered at startup
  Paths,
  /// Render a page to stdout
  Render(RenderConfig),
}

#[derive(Parser)]
struct RenderConfig {
  /// Post slug. Renders the home page when omitted
  slug: Option<String>,
  /// Read content from this preview ref instead of the published one
  #[clap(long)]
  preview_ref: Option<String>,
  /// Listing pages to load when rendering the home page
  #[clap(long, default_value = "1")]
  pages: usize,
}

impl RenderConfig {
  fn scope(&self) -> ContentScope {
    match &self.preview_ref {
      Some(reference) => ContentScope::Preview(reference.clone()),
      None => ContentScope::Published,
    }
  }
}

impl Cli {
  fn load_config(&self) -> anyhow::Result<SiteConfig> {
    let mut config = SiteConfig::load_from_file(&self.config)
      .with_context(|| format!("failed to load {}", self.config.display()))?;

    if let Some(token) = &self.access_token {
      config.access_token = Some(token.clone());
    }
    if let Some(secret) = &self.cookie_secret {
      config.cookie_secret = Some(secret.clone());
    }
    config.validate().context("invalid configuration")?;

    Ok(config)
  }

  pub async fn run(self) -> anyhow::Result<()> {
    let config = self.load_config()?;

    match self.subcmd {
      SubCommand::Server(server_config) => {
        server_config.run(config).await.context("server failed")
      }
      SubCommand::Paths => list_paths(&config).await,
      SubCommand::Render(render_config) => {
        render_page(&config, &render_config).await
      }
    }
  }
}

async fn list_paths(config: &SiteConfig) -> anyhow::Result<()> {
  let client = config.build_client()?;
  let links = RenderSettings::from_config(config)?.links;
  let slugs = post::resolve_paths(&client, config.prerender_limit)
    .await
    .context("failed to enumerate posts")?;

  for slug in slugs {
    println!("{}", links.resolve_post(&slug));
  }
  Ok(())
}

async fn render_page(
  config: &SiteConfig,
  render_config: &RenderConfig,
) -> anyhow::Result<()> {
  let client = config.build_client()?;
  let settings = RenderSettings::from_config(config)?;
  let scope = render_config.scope();

  let html = match &render_config.slug {
    None => {
      let initial =
        listing::load_initial_page(&client, settings.page_size, &scope)
          .await
          .context("failed to load the post listing")?;
      let mut listing = PostListing::new(initial);
      for _ in 1..render_config.pages {
        if !listing.load_more(&client).await? {
          break;
        }
      }
      listing::render_home(&listing, &settings, &scope)
    }
    Some(slug) => {
      let page = post::load_post_page(&client, slug, &scope, &settings)
        .await
        .with_context(|| format!("failed to load post {slug}"))?
        .with_context(|| format!("post {slug} not found"))?;
      post::render_post(&page, &settings, &scope)
    }
  };

  println!("{}", html.into_string());
  Ok(())
}

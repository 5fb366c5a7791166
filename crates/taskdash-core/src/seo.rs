//! Page metadata builders and `<head>` tag rendering.

use std::collections::BTreeMap;
use std::fmt::{self, Write as _};

use anyhow::Context;
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use crate::config::Config;

pub const DEFAULT_SITE_URL: &str = "https://yourdomain.com";
pub const DEFAULT_SITE_NAME: &str = "Task Manager";
pub const DEFAULT_CURRENCY: &str = "USD";
pub const TWITTER_CARD: &str = "summary_large_image";
const NO_INDEX: &str = "noindex, nofollow";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Image {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alt: Option<String>,
}

impl From<&str> for Image {
    fn from(url: &str) -> Self {
        Self {
            url: url.to_string(),
            width: None,
            height: None,
            alt: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum PageKind {
    #[default]
    Website,
    Article {
        published_time: String,
        author: String,
        tags: Vec<String>,
    },
    Profile {
        username: String,
    },
}

impl PageKind {
    pub fn og_type(&self) -> &'static str {
        match self {
            PageKind::Website => "website",
            PageKind::Article { .. } => "article",
            PageKind::Profile { .. } => "profile",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeoConfig {
    pub title: String,
    pub description: String,
    pub kind: PageKind,
    pub keywords: Vec<String>,
    pub images: Vec<Image>,
    pub no_index: bool,
    pub canonical: Option<String>,
}

impl SeoConfig {
    pub fn new(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProductSeoConfig {
    pub title: String,
    pub description: String,
    pub keywords: Vec<String>,
    pub images: Vec<Image>,
    pub price: Option<f64>,
    pub currency: Option<String>,
    pub in_stock: Option<bool>,
    pub brand: Option<String>,
    pub category: Option<String>,
    pub canonical: Option<String>,
    pub no_index: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenGraph {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub site_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub locale: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<Image>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub published_time: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub authors: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
}

impl OpenGraph {
    /// Fields set here win; the rest come from `base`.
    fn over(self, base: OpenGraph) -> OpenGraph {
        OpenGraph {
            title: self.title.or(base.title),
            description: self.description.or(base.description),
            url: self.url.or(base.url),
            site_name: self.site_name.or(base.site_name),
            locale: self.locale.or(base.locale),
            kind: self.kind.or(base.kind),
            images: prefer(self.images, base.images),
            published_time: self.published_time.or(base.published_time),
            authors: prefer(self.authors, base.authors),
            tags: prefer(self.tags, base.tags),
            username: self.username.or(base.username),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Twitter {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub card: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub site: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub creator: Option<String>,
}

impl Twitter {
    fn over(self, base: Twitter) -> Twitter {
        Twitter {
            card: self.card.or(base.card),
            title: self.title.or(base.title),
            description: self.description.or(base.description),
            images: prefer(self.images, base.images),
            site: self.site.or(base.site),
            creator: self.creator.or(base.creator),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Metadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata_base: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// `%s` is replaced with the page title.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title_template: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keywords: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub robots: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub canonical: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub authors: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub creator: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub publisher: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub open_graph: Option<OpenGraph>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub twitter: Option<Twitter>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub other: BTreeMap<String, String>,
}

fn prefer<T>(primary: Vec<T>, fallback: Vec<T>) -> Vec<T> {
    if primary.is_empty() { fallback } else { primary }
}

/// Site-wide values every page inherits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Site {
    pub url: Url,
    pub name: String,
}

impl Site {
    pub fn new(url: &str, name: impl Into<String>) -> anyhow::Result<Self> {
        let url = Url::parse(url).with_context(|| format!("invalid site url: {url}"))?;
        Ok(Self {
            url,
            name: name.into(),
        })
    }

    pub fn from_config(cfg: &Config) -> anyhow::Result<Self> {
        let url = cfg
            .get("site.url")
            .unwrap_or_else(|| DEFAULT_SITE_URL.to_string());
        let name = cfg
            .get("site.name")
            .unwrap_or_else(|| DEFAULT_SITE_NAME.to_string());
        Self::new(&url, name)
    }

    /// Absolute URL for a site path such as `/dashboard`.
    pub fn absolute(&self, path: &str) -> anyhow::Result<Url> {
        self.url
            .join(path)
            .with_context(|| format!("cannot resolve {path} against {}", self.url))
    }
}

pub fn generate_seo(config: &SeoConfig) -> Metadata {
    let mut open_graph = OpenGraph {
        title: Some(config.title.clone()),
        description: Some(config.description.clone()),
        kind: Some(config.kind.og_type().to_string()),
        images: config.images.clone(),
        ..OpenGraph::default()
    };

    match &config.kind {
        PageKind::Website => {}
        PageKind::Article {
            published_time,
            author,
            tags,
        } => {
            open_graph.published_time = Some(published_time.clone());
            open_graph.authors = vec![author.clone()];
            open_graph.tags = tags.clone();
        }
        PageKind::Profile { username } => {
            open_graph.username = Some(username.clone());
        }
    }

    Metadata {
        title: Some(config.title.clone()),
        description: Some(config.description.clone()),
        keywords: (!config.keywords.is_empty()).then(|| config.keywords.join(", ")),
        robots: config.no_index.then(|| NO_INDEX.to_string()),
        canonical: config.canonical.clone(),
        open_graph: Some(open_graph),
        twitter: Some(Twitter {
            card: Some(TWITTER_CARD.to_string()),
            title: Some(config.title.clone()),
            description: Some(config.description.clone()),
            images: config.images.iter().map(|img| img.url.clone()).collect(),
            ..Twitter::default()
        }),
        ..Metadata::default()
    }
}

/// Layers page metadata over layout defaults. Open Graph and Twitter merge field by field.
pub fn merge_metadata(page: Metadata, defaults: Metadata) -> Metadata {
    let open_graph = match (page.open_graph, defaults.open_graph) {
        (Some(page), Some(base)) => Some(page.over(base)),
        (page, base) => page.or(base),
    };
    let twitter = match (page.twitter, defaults.twitter) {
        (Some(page), Some(base)) => Some(page.over(base)),
        (page, base) => page.or(base),
    };

    let mut other = defaults.other;
    other.extend(page.other);

    Metadata {
        metadata_base: page.metadata_base.or(defaults.metadata_base),
        title: page.title.or(defaults.title),
        title_template: page.title_template.or(defaults.title_template),
        description: page.description.or(defaults.description),
        keywords: page.keywords.or(defaults.keywords),
        robots: page.robots.or(defaults.robots),
        canonical: page.canonical.or(defaults.canonical),
        authors: prefer(page.authors, defaults.authors),
        creator: page.creator.or(defaults.creator),
        publisher: page.publisher.or(defaults.publisher),
        open_graph,
        twitter,
        other,
    }
}

/// Layout-level metadata shared by every route.
pub fn default_metadata(site: &Site) -> Metadata {
    Metadata {
        metadata_base: Some(site.url.to_string()),
        title_template: Some(format!("%s | {}", site.name)),
        authors: vec![site.name.clone()],
        creator: Some(site.name.clone()),
        publisher: Some(site.name.clone()),
        open_graph: Some(OpenGraph {
            url: Some(site.url.to_string()),
            site_name: Some(site.name.clone()),
            locale: Some("en_US".to_string()),
            kind: Some("website".to_string()),
            ..OpenGraph::default()
        }),
        twitter: Some(Twitter {
            card: Some(TWITTER_CARD.to_string()),
            ..Twitter::default()
        }),
        ..Metadata::default()
    }
}

pub fn generate_page_metadata(site: &Site, config: &SeoConfig) -> Metadata {
    merge_metadata(generate_seo(config), default_metadata(site))
}

pub fn generate_product_metadata(site: &Site, config: &ProductSeoConfig) -> Metadata {
    let mut metadata = generate_page_metadata(
        site,
        &SeoConfig {
            title: config.title.clone(),
            description: config.description.clone(),
            kind: PageKind::Website,
            keywords: config.keywords.clone(),
            images: config.images.clone(),
            no_index: config.no_index,
            canonical: config.canonical.clone(),
        },
    );

    let mut tags = BTreeMap::new();
    if let Some(price) = config.price {
        let currency = config
            .currency
            .clone()
            .unwrap_or_else(|| DEFAULT_CURRENCY.to_string());
        for prefix in ["og", "product"] {
            tags.insert(format!("{prefix}:price:amount"), price.to_string());
            tags.insert(format!("{prefix}:price:currency"), currency.clone());
        }
    }
    if let Some(in_stock) = config.in_stock {
        let availability = if in_stock { "in stock" } else { "out of stock" };
        tags.insert("og:availability".to_string(), availability.to_string());
        tags.insert("product:availability".to_string(), availability.to_string());
    }
    if let Some(brand) = config.brand.as_deref().filter(|brand| !brand.is_empty()) {
        tags.insert("og:brand".to_string(), brand.to_string());
        tags.insert("product:brand".to_string(), brand.to_string());
    }
    if let Some(category) = config.category.as_deref().filter(|c| !c.is_empty()) {
        tags.insert("product:category".to_string(), category.to_string());
    }

    // "product" is not an Open Graph type.
    if let Some(open_graph) = metadata.open_graph.as_mut() {
        open_graph.kind = Some("website".to_string());
    }
    metadata.other.extend(tags);
    metadata
}

/// Metadata for each static route of the app.
pub fn route_metadata(site: &Site, route: &str) -> Option<Metadata> {
    let config = match route {
        "/" => SeoConfig {
            keywords: vec![
                "task management".to_string(),
                "productivity".to_string(),
                "dashboard".to_string(),
            ],
            ..SeoConfig::new(
                "Task Manager",
                "Streamline your workflow with our task management solution",
            )
        },
        "/login" => SeoConfig {
            no_index: true,
            ..SeoConfig::new("Login", "Sign in to access your task dashboard")
        },
        "/dashboard" => SeoConfig {
            no_index: true,
            ..SeoConfig::new(
                "Dashboard",
                "Search, filter and page through your team's tasks",
            )
        },
        "/profile" => SeoConfig {
            no_index: true,
            ..SeoConfig::new("Profile", "Your account details")
        },
        _ => return None,
    };

    debug!(route, "building route metadata");
    Some(generate_page_metadata(
        site,
        &SeoConfig {
            canonical: Some(route.to_string()),
            ..config
        },
    ))
}

pub const ROUTES: &[&str] = &["/", "/login", "/dashboard", "/profile"];

impl Metadata {
    /// The document title after applying the template.
    pub fn resolved_title(&self) -> Option<String> {
        let title = self.title.as_deref()?;
        Some(match self.title_template.as_deref() {
            Some(template) if template.contains("%s") => template.replace("%s", title),
            _ => title.to_string(),
        })
    }

    fn resolve(&self, link: &str) -> String {
        self.metadata_base
            .as_deref()
            .and_then(|base| Url::parse(base).ok())
            .and_then(|base| base.join(link).ok())
            .map(|url| url.to_string())
            .unwrap_or_else(|| link.to_string())
    }

    /// Renders the tags a page head would carry, one per line.
    pub fn meta_tags(&self) -> Result<String, fmt::Error> {
        let mut out = String::new();

        if let Some(title) = self.resolved_title() {
            writeln!(out, "<title>{}</title>", escape(&title))?;
        }
        named(&mut out, "description", self.description.as_deref())?;
        named(&mut out, "keywords", self.keywords.as_deref())?;
        named(&mut out, "robots", self.robots.as_deref())?;
        for author in &self.authors {
            named(&mut out, "author", Some(author))?;
        }
        named(&mut out, "creator", self.creator.as_deref())?;
        named(&mut out, "publisher", self.publisher.as_deref())?;
        if let Some(canonical) = &self.canonical {
            writeln!(
                out,
                "<link rel=\"canonical\" href=\"{}\" />",
                escape(&self.resolve(canonical))
            )?;
        }

        if let Some(og) = &self.open_graph {
            property(&mut out, "og:title", og.title.as_deref())?;
            property(&mut out, "og:description", og.description.as_deref())?;
            let url = og.url.as_deref().map(|url| self.resolve(url));
            property(&mut out, "og:url", url.as_deref())?;
            property(&mut out, "og:site_name", og.site_name.as_deref())?;
            property(&mut out, "og:locale", og.locale.as_deref())?;
            for image in &og.images {
                property(&mut out, "og:image", Some(&self.resolve(&image.url)))?;
                let width = image.width.map(|w| w.to_string());
                let height = image.height.map(|h| h.to_string());
                property(&mut out, "og:image:width", width.as_deref())?;
                property(&mut out, "og:image:height", height.as_deref())?;
                property(&mut out, "og:image:alt", image.alt.as_deref())?;
            }
            property(&mut out, "og:type", og.kind.as_deref())?;
            property(
                &mut out,
                "article:published_time",
                og.published_time.as_deref(),
            )?;
            for author in &og.authors {
                property(&mut out, "article:author", Some(author))?;
            }
            for tag in &og.tags {
                property(&mut out, "article:tag", Some(tag))?;
            }
            property(&mut out, "profile:username", og.username.as_deref())?;
        }

        if let Some(twitter) = &self.twitter {
            named(&mut out, "twitter:card", twitter.card.as_deref())?;
            named(&mut out, "twitter:site", twitter.site.as_deref())?;
            named(&mut out, "twitter:creator", twitter.creator.as_deref())?;
            named(&mut out, "twitter:title", twitter.title.as_deref())?;
            named(&mut out, "twitter:description", twitter.description.as_deref())?;
            for image in &twitter.images {
                named(&mut out, "twitter:image", Some(&self.resolve(image)))?;
            }
        }

        for (key, value) in &self.other {
            named(&mut out, key, Some(value))?;
        }

        Ok(out)
    }
}

fn named(out: &mut String, name: &str, content: Option<&str>) -> fmt::Result {
    if let Some(content) = content {
        writeln!(
            out,
            "<meta name=\"{}\" content=\"{}\" />",
            escape(name),
            escape(content)
        )?;
    }
    Ok(())
}

fn property(out: &mut String, property: &str, content: Option<&str>) -> fmt::Result {
    if let Some(content) = content {
        writeln!(
            out,
            "<meta property=\"{}\" content=\"{}\" />",
            escape(property),
            escape(content)
        )?;
    }
    Ok(())
}

pub(crate) fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}

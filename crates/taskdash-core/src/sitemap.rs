use std::fmt::Write as _;

use chrono::{DateTime, SecondsFormat, Utc};

use crate::seo::{Site, escape};

/// Allows every crawler everywhere and points at the sitemap.
pub fn robots_txt(site: &Site) -> anyhow::Result<String> {
    let sitemap = site.absolute("/sitemap.xml")?;
    Ok(format!(
        "# *\nUser-agent: *\nAllow: /\n\n# Host\nHost: {}\n\n# Sitemaps\nSitemap: {sitemap}\n",
        site.url.as_str().trim_end_matches('/')
    ))
}

pub fn sitemap_xml(site: &Site, routes: &[&str], now: DateTime<Utc>) -> anyhow::Result<String> {
    let lastmod = now.to_rfc3339_opts(SecondsFormat::Millis, true);
    let mut out = String::from(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
         <urlset xmlns=\"http://www.sitemaps.org/schemas/sitemap/0.9\">\n",
    );

    for route in routes {
        let loc = site.absolute(route)?;
        writeln!(
            out,
            "<url><loc>{}</loc><lastmod>{lastmod}</lastmod>\
             <changefreq>daily</changefreq><priority>0.7</priority></url>",
            escape(loc.as_str())
        )?;
    }

    out.push_str("</urlset>\n");
    Ok(out)
}

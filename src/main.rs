use anyhow::{bail, Context, Result};
use reqwest::Url;
use serde_json::{Map, Value};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use trexim_analytics::env::SimulatedPage;
use trexim_analytics::kernel::clicks::{ClickedElement, ElementNode, TRACK_ATTR, TRACK_CATEGORY_ATTR};
use trexim_analytics::kernel::scroll::ScrollMetrics;
use trexim_analytics::services::ingest::HttpIngestClient;
use trexim_analytics::TrackerConfig;

const USAGE: &str = "commands: page <doc> <viewport> | scroll <top> | link <href> [text] | \
cta <label> [category] | form <type> [key=value..] | consent on|off | leave | quit";

#[tokio::main]
async fn main() -> Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::from_default_env())
        .finish();
    tracing::subscriber::set_global_default(subscriber).context("setting default subscriber failed")?;

    let config = TrackerConfig::from_env()?;
    let location = std::env::var("TRACKER_PAGE_URL").unwrap_or_else(|_| format!("{}/", config.endpoint));
    let location = Url::parse(&location).with_context(|| format!("invalid page url {location}"))?;

    let page = SimulatedPage::new(location).with_consent_key(config.consent_key.clone());
    page.set_scroll(ScrollMetrics::new(0.0, 4000.0, 800.0));
    if !std::env::args().any(|arg| arg == "--no-consent") {
        page.grant_consent();
    }

    tracing::info!("Replaying page interactions against {}", config.endpoint);
    let client = HttpIngestClient::new(&config);
    let Some(handle) = trexim_analytics::start(Arc::new(page.clone()), client, &config) else {
        tracing::info!("No consent, tracker inert. Nothing to do.");
        return Ok(());
    };

    println!("{USAGE}");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while let Ok(Some(line)) = lines.next_line().await {
        let mut words = line.split_whitespace();
        let Some(cmd) = words.next() else { continue };
        let rest: Vec<&str> = words.collect();

        let outcome = match cmd {
            "page" => set_geometry(&page, &rest),
            "scroll" => scroll(&page, &rest),
            "link" => link(&page, &rest),
            "cta" => cta(&page, &rest),
            "form" => {
                form(&handle, &rest);
                Ok(())
            }
            "consent" => {
                match rest.first() {
                    Some(&"off") => page.revoke_consent(),
                    _ => page.grant_consent(),
                }
                Ok(())
            }
            "leave" => break,
            "quit" => {
                handle.shutdown();
                break;
            }
            _ => {
                println!("{USAGE}");
                Ok(())
            }
        };

        if let Err(e) = outcome {
            tracing::warn!("{}", e);
        }
    }

    // End of input counts as the page going away. After `quit` the driver
    // is already cancelled and the unload goes unheard.
    page.unload();
    handle.finished().await;
    Ok(())
}

fn parse_num(raw: Option<&&str>, what: &str) -> Result<f64> {
    let Some(raw) = raw else { bail!("missing {what}") };
    raw.parse().with_context(|| format!("{what} must be a number"))
}

fn set_geometry(page: &SimulatedPage, args: &[&str]) -> Result<()> {
    let document = parse_num(args.first(), "document height")?;
    let viewport = parse_num(args.get(1), "viewport height")?;
    page.set_scroll(ScrollMetrics::new(0.0, document, viewport));
    Ok(())
}

fn scroll(page: &SimulatedPage, args: &[&str]) -> Result<()> {
    let top = parse_num(args.first(), "scroll position")?;
    page.scroll_to(top);
    page.frame();
    Ok(())
}

fn link(page: &SimulatedPage, args: &[&str]) -> Result<()> {
    let Some(href) = args.first() else { bail!("missing href") };
    let anchor = ElementNode::new("a").attr("href", *href).text(args[1..].join(" "));
    page.click(ClickedElement::new(anchor));
    Ok(())
}

fn cta(page: &SimulatedPage, args: &[&str]) -> Result<()> {
    let Some(label) = args.first() else { bail!("missing label") };
    let mut button = ElementNode::new("button").attr(TRACK_ATTR, *label).text(*label);
    if let Some(category) = args.get(1) {
        button = button.attr(TRACK_CATEGORY_ATTR, *category);
    }
    page.click(ClickedElement::new(button));
    Ok(())
}

fn form(handle: &trexim_analytics::TrackerHandle, args: &[&str]) {
    let form_type = args.first().copied().unwrap_or("contact");
    let extra: Map<String, Value> = args
        .iter()
        .skip(1)
        .filter_map(|pair| pair.split_once('='))
        .map(|(k, v)| (k.to_string(), Value::String(v.to_string())))
        .collect();
    handle.track_form_submit(form_type, extra);
}

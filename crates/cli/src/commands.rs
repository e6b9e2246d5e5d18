//! CLI commands

use anyhow::{Context, Result, bail};
use clap::Subcommand;
use linksphere_core::access::{NavigationState, Redirect};
use linksphere_core::{
    AccessPolicy, FileStore, KeyValueStore, LinkSphereConfig, Location, Navigation, Role,
    RouteTable, SessionContext, SessionStore,
};
use linksphere_http::{ApiClient, CreatePost, LoginRequest, RequestOptions, ResponseType};
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

#[derive(Subcommand)]
pub enum Commands {
    /// Sign in and remember the session
    Login {
        #[arg(long)]
        email: String,

        #[arg(long, env = "LINKSPHERE_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Sign out and forget the stored session
    Logout,

    /// Show the signed-in member
    Whoami,

    /// Submit a link
    Submit {
        url: String,

        /// Category for the link (repeatable)
        #[arg(long = "category")]
        categories: Vec<String>,
    },

    /// GET an API path and print the response
    Get {
        path: String,

        /// Query parameter as key=value (repeatable)
        #[arg(long = "query", value_parser = parse_query_pair)]
        query: Vec<(String, String)>,

        /// Print the body as raw text
        #[arg(long)]
        text: bool,
    },

    /// Download an API path to a file
    Download {
        path: String,

        #[arg(short, long)]
        output: PathBuf,
    },

    /// Check whether a role may open a path ("none" for no role)
    Access { role: String, path: String },

    /// Resolve a navigation with the current session
    Navigate {
        path: String,

        /// Location recorded before an earlier redirect to login
        #[arg(long)]
        from: Option<String>,
    },
}

fn parse_query_pair(raw: &str) -> Result<(String, String), String> {
    raw.split_once('=')
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .ok_or_else(|| format!("expected key=value, got '{raw}'"))
}

fn parse_location(raw: &str) -> Location {
    match raw.split_once('?') {
        Some((path, search)) => Location::new(path).with_search(search),
        None => Location::new(raw),
    }
}

fn connect(config: &LinkSphereConfig) -> Result<ApiClient> {
    let storage: Arc<dyn KeyValueStore> = Arc::new(FileStore::new(config.storage.path.clone()));
    let context = SessionContext::new(Arc::new(SessionStore::new()), storage);
    ApiClient::from_config(config, context).context("Failed to build API client")
}

fn print_redirect(redirect: &Redirect) {
    match redirect.state.as_ref().and_then(|state| state.from.as_ref()) {
        Some(from) => println!("redirect {} (from {})", redirect.to, from.href()),
        None => println!("redirect {}", redirect.to),
    }
}

impl Commands {
    pub async fn execute(self, config: LinkSphereConfig) -> Result<()> {
        match self {
            Commands::Login { email, password } => {
                let client = connect(&config)?;
                let data = client.login(&LoginRequest::new(email, password)).await?;
                println!("Signed in as {} ({})", data.user.email, data.role);
            }
            Commands::Logout => {
                let client = connect(&config)?;
                client.restore_session().await;
                client.logout().await;
                println!("Signed out");
            }
            Commands::Whoami => {
                let client = connect(&config)?;
                if client.restore_session().await {
                    let session = client.session().snapshot();
                    let email = session.user.as_ref().map_or("<unknown>", |u| u.email.as_str());
                    let role = session.role.map_or("<none>", Role::as_str);
                    println!("{email} ({role})");
                } else {
                    println!("Not signed in");
                }
            }
            Commands::Submit { url, categories } => {
                let client = connect(&config)?;
                if !client.restore_session().await {
                    bail!("not signed in; run `linksphere login` first");
                }
                let mut request = CreatePost::new(url);
                if !categories.is_empty() {
                    request = request.with_categories(categories);
                }
                let post = client.create_post(request).await?;
                println!("{}", serde_json::to_string_pretty(&post)?);
            }
            Commands::Get { path, query, text } => {
                let client = connect(&config)?;
                client.restore_session().await;

                let mut options = RequestOptions::new();
                for (key, value) in query {
                    options = options.query(key, value);
                }

                if text {
                    let body: String = client
                        .get(&path, options.response_type(ResponseType::Text))
                        .await?;
                    println!("{body}");
                } else {
                    match client.get::<Value>(&path, options).await? {
                        Value::String(body) => println!("{body}"),
                        body => println!("{}", serde_json::to_string_pretty(&body)?),
                    }
                }
            }
            Commands::Download { path, output } => {
                let client = connect(&config)?;
                client.restore_session().await;

                let bytes = client.download(&path, RequestOptions::new()).await?;
                std::fs::write(&output, &bytes)
                    .with_context(|| format!("Failed to write {}", output.display()))?;
                info!(path = %output.display(), bytes = bytes.len(), "Download saved");
                println!("Saved {} bytes to {}", bytes.len(), output.display());
            }
            Commands::Access { role, path } => {
                let role = if role.eq_ignore_ascii_case("none") {
                    None
                } else {
                    Some(role.to_ascii_uppercase().parse::<Role>()?)
                };
                let policy = AccessPolicy::global();
                let verdict = if policy.can_access_path(role, &path) {
                    "allowed"
                } else {
                    "denied"
                };
                println!("{path}: {verdict}");
                println!("landing path: {}", policy.root_path(role));
            }
            Commands::Navigate { path, from } => {
                let client = connect(&config)?;
                client.restore_session().await;

                let session = client.session().snapshot();
                let state = from.map(|from| NavigationState::from_location(parse_location(&from)));
                let navigation =
                    RouteTable::default().resolve(&session, &parse_location(&path), state.as_ref());

                match navigation {
                    Navigation::Render(page) => println!("render {page:?}"),
                    Navigation::Redirect(redirect) => print_redirect(&redirect),
                    Navigation::Forbidden => println!("forbidden"),
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_pairs_need_equals() {
        assert_eq!(
            parse_query_pair("page=2").unwrap(),
            ("page".to_string(), "2".to_string())
        );
        assert_eq!(
            parse_query_pair("q=a=b").unwrap(),
            ("q".to_string(), "a=b".to_string())
        );
        assert!(parse_query_pair("page").is_err());
    }

    #[test]
    fn locations_split_search() {
        let location = parse_location("/post?page=2");
        assert_eq!(location.pathname, "/post");
        assert_eq!(location.search, "page=2");
        assert_eq!(parse_location("/admin").href(), "/admin");
    }
}

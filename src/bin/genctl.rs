use clap::{Parser, Subcommand};
use serde_json::{json, Map, Value};

#[derive(Parser, Debug)]
#[command(name = "genctl", about = "CLI for the AdGen Pipeline service", version)]
struct Cli {
    /// Service base URL
    #[arg(global = true, long, default_value = "http://127.0.0.1:8190")]
    service_url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Dry-run context resolution for a request body
    Resolve {
        /// Client brief text
        #[arg(long)]
        brief: Option<String>,
        /// Explicitly requested industry
        #[arg(long)]
        industry: Option<String>,
        /// Industry stored on the client profile
        #[arg(long)]
        profile_industry: Option<String>,
    },
    /// Generate marketing copy
    Text {
        #[arg(long)]
        brief: Option<String>,
        #[arg(long)]
        industry: Option<String>,
        #[arg(long)]
        audience: Option<String>,
        #[arg(long)]
        tone: Option<String>,
        /// Override the configured text model
        #[arg(long)]
        model: Option<String>,
        #[arg(long)]
        temperature: Option<f64>,
        #[arg(long)]
        max_tokens: Option<u32>,
        /// Attach the redacted debug trace to the response
        #[arg(short, long)]
        debug: bool,
    },
    /// Generate a marketing image
    Image {
        #[command(subcommand)]
        cmd: ImageCmd,
    },
}

#[derive(Subcommand, Debug)]
enum ImageCmd {
    /// Campaign background image
    Background {
        #[command(flatten)]
        args: ImageArgs,
    },
    /// Complete campaign visual
    Compose {
        #[command(flatten)]
        args: ImageArgs,
    },
    /// Restyle an existing image
    FromImage {
        #[command(flatten)]
        args: ImageArgs,
        /// Source image URL or reference
        #[arg(long)]
        source_image: String,
    },
}

#[derive(clap::Args, Debug)]
struct ImageArgs {
    #[arg(long)]
    brief: Option<String>,
    #[arg(long)]
    industry: Option<String>,
    /// Aspect preset: square, portrait or landscape
    #[arg(long)]
    format: Option<String>,
    #[arg(long)]
    width: Option<u32>,
    #[arg(long)]
    height: Option<u32>,
    /// Reuse a key to reproduce the same creative variation
    #[arg(long)]
    variation_key: Option<String>,
    #[arg(short, long)]
    debug: bool,
}

fn insert_opt(body: &mut Map<String, Value>, key: &str, value: Option<Value>) {
    if let Some(v) = value {
        body.insert(key.to_string(), v);
    }
}

fn image_body(args: &ImageArgs) -> Map<String, Value> {
    let mut body = Map::new();
    insert_opt(&mut body, "brief", args.brief.clone().map(Value::from));
    insert_opt(&mut body, "industry", args.industry.clone().map(Value::from));
    insert_opt(&mut body, "format", args.format.clone().map(Value::from));
    insert_opt(&mut body, "width", args.width.map(Value::from));
    insert_opt(&mut body, "height", args.height.map(Value::from));
    insert_opt(
        &mut body,
        "variationKey",
        args.variation_key.clone().map(Value::from),
    );
    body.insert("debug".to_string(), Value::from(args.debug));
    body
}

async fn post_json(url: &str, body: Value) -> Result<(), String> {
    let client = reqwest::Client::new();
    let response = client
        .post(url)
        .json(&body)
        .send()
        .await
        .map_err(|e| format!("request failed: {}", e))?;
    let status = response.status();
    let text = response
        .text()
        .await
        .map_err(|e| format!("failed to read body: {}", e))?;
    let pretty = serde_json::from_str::<Value>(&text)
        .and_then(|v| serde_json::to_string_pretty(&v))
        .unwrap_or(text);
    println!("{}", pretty);
    if status.is_success() {
        Ok(())
    } else {
        Err(format!("service returned {}", status))
    }
}

#[tokio::main]
async fn main() -> Result<(), String> {
    let cli = Cli::parse();
    let base = cli.service_url.trim_end_matches('/').to_string();

    match cli.command {
        Commands::Resolve {
            brief,
            industry,
            profile_industry,
        } => {
            let mut body = Map::new();
            insert_opt(&mut body, "brief", brief.map(Value::from));
            insert_opt(&mut body, "industry", industry.map(Value::from));
            if let Some(pi) = profile_industry {
                body.insert("clientProfile".to_string(), json!({ "industry": pi }));
            }
            post_json(&format!("{}/resolve", base), Value::Object(body)).await
        }
        Commands::Text {
            brief,
            industry,
            audience,
            tone,
            model,
            temperature,
            max_tokens,
            debug,
        } => {
            let mut body = Map::new();
            insert_opt(&mut body, "brief", brief.map(Value::from));
            insert_opt(&mut body, "industry", industry.map(Value::from));
            insert_opt(&mut body, "audience", audience.map(Value::from));
            insert_opt(&mut body, "tone", tone.map(Value::from));
            insert_opt(&mut body, "model", model.map(Value::from));
            insert_opt(&mut body, "temperature", temperature.map(Value::from));
            insert_opt(&mut body, "maxTokens", max_tokens.map(Value::from));
            body.insert("debug".to_string(), Value::from(debug));
            post_json(&format!("{}/generate/text", base), Value::Object(body)).await
        }
        Commands::Image { cmd } => match cmd {
            ImageCmd::Background { args } => {
                post_json(
                    &format!("{}/generate/image/background", base),
                    Value::Object(image_body(&args)),
                )
                .await
            }
            ImageCmd::Compose { args } => {
                post_json(
                    &format!("{}/generate/image/compose", base),
                    Value::Object(image_body(&args)),
                )
                .await
            }
            ImageCmd::FromImage { args, source_image } => {
                let mut body = image_body(&args);
                body.insert("sourceImage".to_string(), Value::from(source_image));
                post_json(
                    &format!("{}/generate/image/from-image", base),
                    Value::Object(body),
                )
                .await
            }
        },
    }
}

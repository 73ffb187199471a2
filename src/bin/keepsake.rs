//! keepsake - CLI client
//!
//! Talks to a keepsake server over its HTTP API. Secret payload fields are
//! encrypted locally before upload (and decrypted locally after download)
//! unless `--no-encrypt` is given; the server never sees the passphrase.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use clap::{Parser, Subcommand};
use dialoguer::Password;

use keepsake::api::types::{
    BankCardPayload, BlobPayload, CreateSecretRequest, CredentialsPayload, NotePayload,
    SecretResponse,
};
use keepsake::client::ApiClient;
use keepsake::crypto;
use keepsake::storage::{Kind, SecretValue};

#[derive(Parser)]
#[command(name = "keepsake", version, about = "Personal secret vault client")]
struct Cli {
    /// Server base URL
    #[arg(long, env = "KEEPSAKE_SERVER", default_value = "http://127.0.0.1:8081")]
    server: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Register a new account on the server
    Register { login: String },

    /// Log in and store the session token locally
    Login { login: String },

    /// List all secrets
    List,

    /// Fetch all secrets and cache the index locally
    Sync,

    /// Show one secret with its value
    Get {
        name: String,
        /// Write a blob's bytes into this file instead of printing
        #[arg(long, short)]
        output: Option<PathBuf>,
    },

    /// Create a login/password secret (password is prompted)
    CreateCredentials {
        name: String,
        login: String,
        #[arg(long)]
        description: Option<String>,
        /// Skip client-side encryption
        #[arg(long)]
        no_encrypt: bool,
    },

    /// Create a free-text note secret
    CreateNote {
        name: String,
        body: String,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        no_encrypt: bool,
    },

    /// Create a binary blob secret from a file
    CreateBlob {
        name: String,
        file: PathBuf,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        no_encrypt: bool,
    },

    /// Create a bank card secret (CVV is prompted)
    CreateBankCard {
        name: String,
        holder: String,
        number: String,
        date: String,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        no_encrypt: bool,
    },

    /// Replace the payload of a credentials secret (password is prompted)
    EditCredentials { name: String, login: String },

    /// Replace the payload of a note secret
    EditNote { name: String, body: String },

    /// Replace the payload of a blob secret from a file
    EditBlob { name: String, file: PathBuf },

    /// Replace the payload of a bank card secret (CVV is prompted)
    EditBankCard {
        name: String,
        holder: String,
        number: String,
        date: String,
    },

    /// Rename a secret
    Rename { name: String, new_name: String },

    /// Replace a secret's description (omit the text to clear it)
    Describe {
        name: String,
        description: Option<String>,
    },

    /// Delete a secret
    Delete { name: String },

    /// Attach a tag to a secret
    Tag { name: String, tag: String },

    /// Remove a tag from a secret
    Untag { name: String, tag: String },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Register { login } => {
            let password = prompt_password("Enter account password")?;
            let client = ApiClient::new(&cli.server, None);
            let session = client.register(&login, &password).await?;
            save_token(&session.token)?;
            println!("Registered '{login}' and logged in");
        }
        Command::Login { login } => {
            let password = prompt_password("Enter account password")?;
            let client = ApiClient::new(&cli.server, None);
            let session = client.login(&login, &password).await?;
            save_token(&session.token)?;
            println!("Logged in as '{login}'");
        }
        Command::List => {
            let client = authed_client(&cli.server)?;
            let secrets = client.secrets().await?;
            if secrets.is_empty() {
                println!("No secrets stored yet");
            }
            for secret in &secrets {
                print_summary(secret);
            }
        }
        Command::Sync => {
            let client = authed_client(&cli.server)?;
            let secrets = client.secrets().await?;
            let path = config_dir()?.join("secrets.json");
            std::fs::write(&path, serde_json::to_vec_pretty(&secrets)?)
                .with_context(|| format!("could not write {}", path.display()))?;
            println!("Synchronized {} secrets from the server", secrets.len());
        }
        Command::Get { name, output } => {
            let client = authed_client(&cli.server)?;
            let secret = resolve_secret(&client, &name).await?;
            // Re-fetch by id for the freshest value.
            let secret = client.secret(secret.id).await?;
            show_secret(&secret, output.as_deref())?;
        }
        Command::CreateCredentials {
            name,
            login,
            description,
            no_encrypt,
        } => {
            let client = authed_client(&cli.server)?;
            let password = prompt_password("Enter secret credentials password")?;
            let key = encryption_key(no_encrypt, false)?;
            let (login, password) = match &key {
                Some(key) => (
                    crypto::encrypt_str(key, &login)?,
                    crypto::encrypt_str(key, &password)?,
                ),
                None => (login, password),
            };
            let created = client
                .create_credentials(&CreateSecretRequest {
                    name: name.clone(),
                    is_encrypted: key.is_some(),
                    description,
                    value: CredentialsPayload { login, password },
                })
                .await?;
            println!("Created secret credentials '{name}' with id '{}'", created.id);
        }
        Command::CreateNote {
            name,
            body,
            description,
            no_encrypt,
        } => {
            let client = authed_client(&cli.server)?;
            let key = encryption_key(no_encrypt, false)?;
            let body = match &key {
                Some(key) => crypto::encrypt_str(key, &body)?,
                None => body,
            };
            let created = client
                .create_note(&CreateSecretRequest {
                    name: name.clone(),
                    is_encrypted: key.is_some(),
                    description,
                    value: NotePayload { body },
                })
                .await?;
            println!("Created secret note '{name}' with id '{}'", created.id);
        }
        Command::CreateBlob {
            name,
            file,
            description,
            no_encrypt,
        } => {
            let client = authed_client(&cli.server)?;
            let bytes = std::fs::read(&file)
                .with_context(|| format!("could not read {}", file.display()))?;
            let key = encryption_key(no_encrypt, false)?;
            let body = encode_blob(&key, &bytes)?;
            let created = client
                .create_blob(&CreateSecretRequest {
                    name: name.clone(),
                    is_encrypted: key.is_some(),
                    description,
                    value: BlobPayload { body },
                })
                .await?;
            println!("Created secret blob '{name}' with id '{}'", created.id);
        }
        Command::CreateBankCard {
            name,
            holder,
            number,
            date,
            description,
            no_encrypt,
        } => {
            let client = authed_client(&cli.server)?;
            let cvv = prompt_password("Enter card CVV")?;
            let key = encryption_key(no_encrypt, false)?;
            let value = seal_bank_card(&key, holder, number, date, cvv)?;
            let created = client
                .create_bank_card(&CreateSecretRequest {
                    name: name.clone(),
                    is_encrypted: key.is_some(),
                    description,
                    value,
                })
                .await?;
            println!("Created secret bank card '{name}' with id '{}'", created.id);
        }
        Command::EditCredentials { name, login } => {
            let client = authed_client(&cli.server)?;
            let secret = resolve_secret(&client, &name).await?;
            let password = prompt_password("Enter secret credentials password")?;
            let key = key_for_existing(&secret)?;
            let (login, password) = match &key {
                Some(key) => (
                    crypto::encrypt_str(key, &login)?,
                    crypto::encrypt_str(key, &password)?,
                ),
                None => (login, password),
            };
            client
                .edit_credentials(secret.id, &CredentialsPayload { login, password })
                .await?;
            println!("Updated secret credentials '{name}'");
        }
        Command::EditNote { name, body } => {
            let client = authed_client(&cli.server)?;
            let secret = resolve_secret(&client, &name).await?;
            let key = key_for_existing(&secret)?;
            let body = match &key {
                Some(key) => crypto::encrypt_str(key, &body)?,
                None => body,
            };
            client.edit_note(secret.id, &NotePayload { body }).await?;
            println!("Updated secret note '{name}'");
        }
        Command::EditBlob { name, file } => {
            let client = authed_client(&cli.server)?;
            let secret = resolve_secret(&client, &name).await?;
            let bytes = std::fs::read(&file)
                .with_context(|| format!("could not read {}", file.display()))?;
            let key = key_for_existing(&secret)?;
            let body = encode_blob(&key, &bytes)?;
            client.edit_blob(secret.id, &BlobPayload { body }).await?;
            println!("Updated secret blob '{name}'");
        }
        Command::EditBankCard {
            name,
            holder,
            number,
            date,
        } => {
            let client = authed_client(&cli.server)?;
            let secret = resolve_secret(&client, &name).await?;
            let cvv = prompt_password("Enter card CVV")?;
            let key = key_for_existing(&secret)?;
            let value = seal_bank_card(&key, holder, number, date, cvv)?;
            client.edit_bank_card(secret.id, &value).await?;
            println!("Updated secret bank card '{name}'");
        }
        Command::Rename { name, new_name } => {
            let client = authed_client(&cli.server)?;
            let secret = resolve_secret(&client, &name).await?;
            client.rename_secret(secret.id, &new_name).await?;
            println!("Renamed '{name}' to '{new_name}'");
        }
        Command::Describe { name, description } => {
            let client = authed_client(&cli.server)?;
            let secret = resolve_secret(&client, &name).await?;
            client.change_description(secret.id, description).await?;
            println!("Updated description of '{name}'");
        }
        Command::Delete { name } => {
            let client = authed_client(&cli.server)?;
            let secret = resolve_secret(&client, &name).await?;
            client.delete_secret(secret.id).await?;
            println!("Deleted secret '{name}'");
        }
        Command::Tag { name, tag } => {
            let client = authed_client(&cli.server)?;
            let secret = resolve_secret(&client, &name).await?;
            client.add_tag(secret.id, &tag).await?;
            println!("Tagged '{name}' with '{tag}'");
        }
        Command::Untag { name, tag } => {
            let client = authed_client(&cli.server)?;
            let secret = resolve_secret(&client, &name).await?;
            client.delete_tag(secret.id, &tag).await?;
            println!("Removed tag '{tag}' from '{name}'");
        }
    }

    Ok(())
}

fn config_dir() -> anyhow::Result<PathBuf> {
    let base = std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/root".to_string());
            Path::new(&home).join(".config")
        });
    let dir = base.join("keepsake");
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("could not create config dir {}", dir.display()))?;
    Ok(dir)
}

fn save_token(token: &str) -> anyhow::Result<()> {
    let path = config_dir()?.join("token");
    std::fs::write(&path, token)
        .with_context(|| format!("could not write token to {}", path.display()))
}

fn load_token() -> Option<String> {
    let path = config_dir().ok()?.join("token");
    let token = std::fs::read_to_string(path).ok()?;
    let token = token.trim().to_string();
    (!token.is_empty()).then_some(token)
}

fn authed_client(server: &str) -> anyhow::Result<ApiClient> {
    match load_token() {
        Some(token) => Ok(ApiClient::new(server, Some(token))),
        None => bail!("no session token found; run `keepsake login <login>` first"),
    }
}

fn prompt_password(prompt: &str) -> anyhow::Result<String> {
    Ok(Password::new().with_prompt(prompt).interact()?)
}

/// Prompt for the encryption passphrase and derive the field key.
///
/// Returns `None` (plaintext mode) when `no_encrypt` is set, or when the
/// user submits an empty passphrase. `force` ignores `no_encrypt`, used when
/// a fetched secret is known to be encrypted.
fn encryption_key(no_encrypt: bool, force: bool) -> anyhow::Result<Option<[u8; 32]>> {
    if no_encrypt && !force {
        eprintln!("WARNING: client-side encryption disabled, the server will see this payload");
        return Ok(None);
    }

    let passphrase = Password::new()
        .with_prompt("Enter encryption key (NOT your account password)")
        .allow_empty_password(true)
        .interact()?;

    if passphrase.is_empty() {
        eprintln!("WARNING: empty encryption key, payload will be stored unencrypted");
        return Ok(None);
    }

    Ok(Some(crypto::derive_key(&passphrase)))
}

/// Key for re-sealing an existing secret: encrypted secrets require a
/// passphrase, plaintext secrets stay plaintext.
fn key_for_existing(secret: &SecretResponse) -> anyhow::Result<Option<[u8; 32]>> {
    if !secret.is_encrypted {
        return Ok(None);
    }
    println!("This secret is encrypted, so you'll have to enter the encryption key");
    match encryption_key(false, true)? {
        Some(key) => Ok(Some(key)),
        None => bail!("an encrypted secret cannot be updated without its encryption key"),
    }
}

fn encode_blob(key: &Option<[u8; 32]>, bytes: &[u8]) -> anyhow::Result<String> {
    Ok(match key {
        Some(key) => crypto::encrypt(key, bytes)?,
        None => BASE64.encode(bytes),
    })
}

fn seal_bank_card(
    key: &Option<[u8; 32]>,
    holder: String,
    number: String,
    date: String,
    cvv: String,
) -> anyhow::Result<BankCardPayload> {
    Ok(match key {
        Some(key) => BankCardPayload {
            name: crypto::encrypt_str(key, &holder)?,
            number: crypto::encrypt_str(key, &number)?,
            date: crypto::encrypt_str(key, &date)?,
            cvv: crypto::encrypt_str(key, &cvv)?,
        },
        None => BankCardPayload {
            name: holder,
            number,
            date,
            cvv,
        },
    })
}

async fn resolve_secret(client: &ApiClient, name: &str) -> anyhow::Result<SecretResponse> {
    let secrets = client.secrets().await?;
    secrets
        .into_iter()
        .find(|s| s.name == name)
        .with_context(|| format!("secret '{name}' not found"))
}

fn print_summary(secret: &SecretResponse) {
    let encrypted = if secret.is_encrypted { " [encrypted]" } else { "" };
    let tags = if secret.tags.is_empty() {
        String::new()
    } else {
        format!(" #{}", secret.tags.join(" #"))
    };
    println!("{} ({}){}{}", secret.name, secret.kind, encrypted, tags);
    if let Some(description) = &secret.description {
        println!("    {description}");
    }
}

fn show_secret(secret: &SecretResponse, output: Option<&Path>) -> anyhow::Result<()> {
    let value = secret.decoded_value().context("malformed secret value")?;

    if secret.kind == Kind::Blob && output.is_none() {
        bail!(
            "secret '{}' is a blob; provide --output to write its bytes to a file",
            secret.name
        );
    }

    let key = if secret.is_encrypted {
        println!("This secret is encrypted, so you'll have to enter the encryption key");
        match encryption_key(false, true)? {
            Some(key) => Some(key),
            None => bail!("an encrypted secret cannot be shown without its encryption key"),
        }
    } else {
        None
    };

    let open = |field: &str| -> anyhow::Result<String> {
        match &key {
            Some(key) => Ok(crypto::decrypt_str(key, field)
                .context("check your encryption key and try again")?),
            None => Ok(field.to_string()),
        }
    };

    print_summary(secret);
    match value {
        SecretValue::Credentials { login, password } => {
            println!("login:    {}", open(&login)?);
            println!("password: {}", open(&password)?);
        }
        SecretValue::Note { body } => {
            println!("{}", open(&body)?);
        }
        SecretValue::Blob { body } => {
            let bytes = match &key {
                Some(key) => {
                    crypto::decrypt(key, &body).context("check your encryption key and try again")?
                }
                None => BASE64
                    .decode(body.as_bytes())
                    .context("stored blob is not valid base64")?,
            };
            let Some(path) = output else {
                bail!("no output path for blob bytes");
            };
            std::fs::write(path, bytes)
                .with_context(|| format!("could not write {}", path.display()))?;
            println!("wrote blob bytes to {}", path.display());
        }
        SecretValue::BankCard {
            name,
            number,
            date,
            cvv,
        } => {
            println!("holder: {}", open(&name)?);
            println!("number: {}", open(&number)?);
            println!("date:   {}", open(&date)?);
            println!("cvv:    {}", open(&cvv)?);
        }
    }

    Ok(())
}

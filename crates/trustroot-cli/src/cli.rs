use clap::{ArgAction, Args, Parser, Subcommand};
use std::path::PathBuf;

use trustroot::x509::{DnScope, KeyType};
use trustroot::Id;

#[derive(Parser, Debug)]
#[command(name = "trustroot")]
#[command(about = "Certificate authority and identity lifecycle manager", long_about = None)]
pub struct Cli {
    /// Shared API store (SQLite database)
    #[arg(long, env = "TRUSTROOT_API", default_value = "trustroot-api.db")]
    pub api: PathBuf,

    /// Private home store (SQLite database)
    #[arg(long, env = "TRUSTROOT_HOME", default_value = "trustroot-home.db")]
    pub home: PathBuf,

    /// Path to a JSON configuration file
    #[arg(short, long, env = "TRUSTROOT_CONFIG")]
    pub config: Option<PathBuf>,

    /// More logging (-v debug, -vv trace); RUST_LOG takes precedence
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Manage the organization
    Org {
        #[command(subcommand)]
        action: OrgAction,
    },
    /// Manage and enroll admins
    Admin {
        #[command(subcommand)]
        action: AdminAction,
    },
    /// Manage and enroll nodes
    Node {
        #[command(subcommand)]
        action: NodeAction,
    },
    /// Manage certificate authorities
    Ca {
        #[command(subcommand)]
        action: CaAction,
    },
    /// Manage certificates
    Cert {
        #[command(subcommand)]
        action: CertAction,
    },
    /// Manage certificate signing requests
    Csr {
        #[command(subcommand)]
        action: CsrAction,
    },
    /// Manage node registration keys
    PairingKey {
        #[command(subcommand)]
        action: PairingKeyAction,
    },
}

// ─────────────────────────────────────────────────────────────────────────────
// Shared arguments
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Args, Debug, Clone, Default)]
pub struct DnArgs {
    #[arg(long)]
    pub country: Option<String>,
    #[arg(long)]
    pub province: Option<String>,
    #[arg(long)]
    pub locality: Option<String>,
    #[arg(long)]
    pub organization: Option<String>,
    #[arg(long)]
    pub organizational_unit: Option<String>,
    #[arg(long)]
    pub street_address: Option<String>,
    #[arg(long)]
    pub postal_code: Option<String>,
}

impl From<DnArgs> for DnScope {
    fn from(args: DnArgs) -> Self {
        DnScope {
            country: args.country,
            province: args.province,
            locality: args.locality,
            organization: args.organization,
            organizational_unit: args.organizational_unit,
            street_address: args.street_address,
            postal_code: args.postal_code,
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct DeleteArgs {
    pub name: String,
    /// Confirm the deletion
    #[arg(long)]
    pub yes: bool,
}

fn parse_id(s: &str) -> Result<Id, String> {
    s.parse::<Id>().map_err(|e| e.to_string())
}

fn parse_key_type(s: &str) -> Result<KeyType, String> {
    s.parse::<KeyType>().map_err(|e| e.to_string())
}

// ─────────────────────────────────────────────────────────────────────────────
// Resources
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Subcommand, Debug)]
pub enum OrgAction {
    /// Create an organization and its first admin
    Create {
        #[arg(long)]
        name: String,
        #[arg(long)]
        admin: String,
    },
    Show,
    List,
    Delete(DeleteArgs),
}

#[derive(Subcommand, Debug)]
pub enum AdminAction {
    /// Issue an invite key for a new admin
    Invite { name: String },
    /// Join an organization with an invite key
    Join {
        #[arg(long)]
        name: String,
        #[arg(long, value_parser = parse_id)]
        org_id: Id,
        #[arg(long)]
        org_name: String,
        #[arg(long, value_parser = parse_id)]
        invite_id: Id,
        #[arg(long, env = "TRUSTROOT_INVITE_KEY")]
        invite_key: String,
    },
    /// Process pending join requests
    Run,
    /// Finish joining once the request was processed
    Complete {
        #[arg(long, value_parser = parse_id)]
        invite_id: Id,
        #[arg(long, env = "TRUSTROOT_INVITE_KEY")]
        invite_key: String,
    },
    List,
    Show { name: String },
    Delete(DeleteArgs),
}

#[derive(Subcommand, Debug)]
pub enum NodeAction {
    /// Create a node in this home and send its registration
    Create {
        #[arg(long)]
        name: String,
        #[arg(long, value_parser = parse_id)]
        org_id: Id,
        #[arg(long, value_parser = parse_id)]
        pairing_id: Id,
        #[arg(long, env = "TRUSTROOT_PAIRING_KEY")]
        pairing_key: String,
    },
    /// Receive the organization's registration answer
    Complete { name: String },
    /// Top up the node's CSR pool
    Csrs { name: String },
    /// Receive delivered certificates
    Run { name: String },
    /// Certificates held by a node in this home
    Certificates {
        name: String,
        #[arg(long)]
        export: Option<PathBuf>,
    },
    /// Process pending node registrations
    Register,
    /// Sign a node's outstanding CSRs
    Issue {
        #[arg(long)]
        node: String,
        #[arg(long)]
        ca: String,
        #[arg(long)]
        limit: Option<usize>,
        #[arg(long)]
        keep_subject: bool,
        #[arg(long)]
        tags: Option<String>,
    },
    List,
    Show { name: String },
    Delete(DeleteArgs),
}

#[derive(Subcommand, Debug)]
pub enum CaAction {
    /// Generate a root CA or import one
    Create {
        name: String,
        #[arg(long)]
        ca_expiry: Option<u32>,
        #[arg(long)]
        cert_expiry: Option<u32>,
        #[arg(long, value_parser = parse_key_type)]
        key_type: Option<KeyType>,
        #[command(flatten)]
        dn: DnArgs,
        /// Import this PEM certificate instead of generating
        #[arg(long)]
        import_cert: Option<PathBuf>,
        #[arg(long, requires = "import_cert")]
        import_key: Option<PathBuf>,
        /// Comma-separated tags, or NAME for the CA's own name
        #[arg(long)]
        tags: Option<String>,
    },
    List {
        #[arg(long)]
        tag: Option<String>,
    },
    Show {
        name: String,
        #[arg(long)]
        export: Option<PathBuf>,
    },
    Update {
        name: String,
        #[arg(long)]
        cert: Option<PathBuf>,
        #[arg(long)]
        key: Option<PathBuf>,
        #[arg(long)]
        cert_expiry: Option<u32>,
        #[command(flatten)]
        dn: DnArgs,
        #[arg(long)]
        tags: Option<String>,
    },
    Delete(DeleteArgs),
}

#[derive(Subcommand, Debug)]
pub enum CertAction {
    /// Generate (self-signed or CA-signed) or import a certificate
    Create {
        name: String,
        #[arg(long)]
        ca: Option<String>,
        #[arg(long, value_parser = parse_key_type)]
        key_type: Option<KeyType>,
        #[arg(long)]
        expiry: Option<u32>,
        #[command(flatten)]
        dn: DnArgs,
        #[arg(long, conflicts_with = "ca")]
        import_cert: Option<PathBuf>,
        #[arg(long, requires = "import_cert")]
        import_key: Option<PathBuf>,
        #[arg(long)]
        tags: Option<String>,
        /// Do not store or index; print or export only
        #[arg(long)]
        standalone: bool,
        #[arg(long)]
        export: Option<PathBuf>,
    },
    List {
        #[arg(long)]
        tag: Option<String>,
    },
    Show {
        name: String,
        #[arg(long)]
        export: Option<PathBuf>,
    },
    Update {
        name: String,
        #[arg(long)]
        cert: Option<PathBuf>,
        #[arg(long)]
        key: Option<PathBuf>,
        #[arg(long)]
        tags: Option<String>,
    },
    Delete(DeleteArgs),
}

#[derive(Subcommand, Debug)]
pub enum CsrAction {
    /// Generate or import a CSR
    Create {
        name: String,
        #[arg(long, value_parser = parse_key_type)]
        key_type: Option<KeyType>,
        #[command(flatten)]
        dn: DnArgs,
        #[arg(long)]
        import_csr: Option<PathBuf>,
        #[arg(long, requires = "import_csr")]
        import_key: Option<PathBuf>,
        #[arg(long)]
        tags: Option<String>,
        #[arg(long)]
        standalone: bool,
        #[arg(long)]
        export: Option<PathBuf>,
    },
    /// Sign a stored CSR with a CA
    Sign {
        name: String,
        #[arg(long)]
        ca: String,
        #[arg(long)]
        keep_subject: bool,
        /// Certificate name (defaults to the CSR name)
        #[arg(long)]
        cert_name: Option<String>,
        #[arg(long)]
        tags: Option<String>,
    },
    List {
        #[arg(long)]
        tag: Option<String>,
    },
    Show {
        name: String,
        #[arg(long)]
        export: Option<PathBuf>,
    },
    Update {
        name: String,
        #[arg(long)]
        csr: Option<PathBuf>,
        #[arg(long)]
        key: Option<PathBuf>,
        #[arg(long)]
        tags: Option<String>,
    },
    Delete(DeleteArgs),
}

#[derive(Subcommand, Debug)]
pub enum PairingKeyAction {
    /// Issue a node registration key
    New {
        #[arg(long)]
        tags: Option<String>,
    },
    List,
    Show {
        #[arg(value_parser = parse_id)]
        id: Id,
    },
    Delete {
        #[arg(value_parser = parse_id)]
        id: Id,
        #[arg(long)]
        yes: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_ca_create() {
        let cli = Cli::try_parse_from([
            "trustroot",
            "ca",
            "create",
            "root",
            "--key-type",
            "ecdsa-p256",
            "--country",
            "NL",
            "--tags",
            "NAME",
        ])
        .unwrap();
        match cli.command {
            Command::Ca {
                action: CaAction::Create { name, key_type, dn, .. },
            } => {
                assert_eq!(name, "root");
                assert_eq!(key_type, Some(KeyType::EcdsaP256));
                assert_eq!(DnScope::from(dn).country.as_deref(), Some("NL"));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_bad_id_rejected() {
        let result = Cli::try_parse_from(["trustroot", "pairing-key", "show", "xyz"]);
        assert!(result.is_err());
    }
}

//! Dispatch from parsed arguments to the controllers.

use anyhow::{bail, Result};
use std::path::{Path, PathBuf};

use trustroot::core::join_tags;
use trustroot::files::{export_ca, export_certificate, export_csr};
use trustroot::params::{
    AdminJoinParams, CaCreateParams, CaUpdateParams, CertCreateParams, CertUpdateParams,
    CsrCreateParams, CsrSignParams, CsrUpdateParams, DeleteParams, NodeCreateParams,
    NodeIssueParams, OrgCreateParams, PemImport,
};
use trustroot::store::Backend;
use trustroot::x509::{Certificate, Csr};
use trustroot::{DrainReport, Environment};

use crate::cli::{
    AdminAction, CaAction, CertAction, Command, CsrAction, DeleteArgs, NodeAction, OrgAction,
    PairingKeyAction,
};

pub async fn run<B: Backend>(env: &Environment<B>, command: Command) -> Result<()> {
    match command {
        Command::Org { action } => org(env, action).await,
        Command::Admin { action } => admin(env, action).await,
        Command::Node { action } => node(env, action).await,
        Command::Ca { action } => ca(env, action).await,
        Command::Cert { action } => cert(env, action).await,
        Command::Csr { action } => csr(env, action).await,
        Command::PairingKey { action } => pairing_key(env, action).await,
    }
}

fn delete_params(args: DeleteArgs) -> DeleteParams {
    DeleteParams {
        name: args.name,
        confirm: args.yes,
    }
}

fn import(pem: Option<PathBuf>, key: Option<PathBuf>) -> Option<PemImport> {
    pem.map(|pem| PemImport { pem, key })
}

fn print_names(names: &[String]) {
    for name in names {
        println!("{name}");
    }
}

fn print_report(report: &DrainReport) {
    println!(
        "consumed {} requeued {} dead-lettered {}",
        report.consumed, report.requeued, report.dead_lettered
    );
}

fn print_exported(paths: &[PathBuf]) {
    for path in paths {
        println!("wrote {}", path.display());
    }
}

fn print_certificate(cert: &Certificate) {
    println!("id: {}", cert.id);
    println!("name: {}", cert.name);
    println!("key type: {}", cert.key_type);
    println!("expiry days: {}", cert.expiry_days);
    print!("{}", cert.certificate_pem);
}

fn print_csr(csr: &Csr) {
    println!("id: {}", csr.id);
    println!("name: {}", csr.name);
    println!("key type: {}", csr.key_type);
    println!("private key: {}", if csr.has_private_key() { "yes" } else { "no" });
    print!("{}", csr.csr_pem);
}

// ─────────────────────────────────────────────────────────────────────────────
// Organization and members
// ─────────────────────────────────────────────────────────────────────────────

async fn org<B: Backend>(env: &Environment<B>, action: OrgAction) -> Result<()> {
    match action {
        OrgAction::Create { name, admin } => {
            let org = env
                .orgs()
                .create(OrgCreateParams { org: name, admin })
                .await?;
            println!("created organization {} ({})", org.name, org.id);
        }
        OrgAction::Show => {
            let info = env.orgs().show().await?;
            println!("id: {}", info.id);
            println!("name: {}", info.name);
            println!("admins: {}", info.admins.join(", "));
            println!("nodes: {}", info.nodes.join(", "));
            println!("pending pairing keys: {}", info.pairing_keys);
        }
        OrgAction::List => {
            for org in env.orgs().list().await? {
                println!("{} {}", org.id, org.name);
            }
        }
        OrgAction::Delete(args) => {
            env.orgs().delete(delete_params(args)).await?;
            println!("organization deleted");
        }
    }
    Ok(())
}

async fn admin<B: Backend>(env: &Environment<B>, action: AdminAction) -> Result<()> {
    match action {
        AdminAction::Invite { name } => {
            let key = env.admins().invite(&name).await?;
            println!("invite id: {}", key.id);
            println!("invite key: {}", key.secret());
        }
        AdminAction::Join {
            name,
            org_id,
            org_name,
            invite_id,
            invite_key,
        } => {
            let id = env
                .admins()
                .join(AdminJoinParams {
                    name,
                    org_id,
                    org_name,
                    invite_id,
                    invite_key,
                })
                .await?;
            println!("join request sent for admin {id}");
        }
        AdminAction::Run => print_report(&env.admins().run().await?),
        AdminAction::Complete {
            invite_id,
            invite_key,
        } => {
            let org = env.admins().complete(invite_id, &invite_key).await?;
            println!("joined organization {} ({})", org.name, org.id);
        }
        AdminAction::List => {
            for (name, id) in env.admins().list().await? {
                println!("{id} {name}");
            }
        }
        AdminAction::Show { name } => {
            let admin = env.admins().show(&name).await?;
            println!("id: {}", admin.id);
            println!("name: {}", admin.name);
            println!("kind: {}", admin.kind);
        }
        AdminAction::Delete(args) => {
            env.admins().delete(delete_params(args)).await?;
            println!("admin deleted");
        }
    }
    Ok(())
}

async fn node<B: Backend>(env: &Environment<B>, action: NodeAction) -> Result<()> {
    match action {
        NodeAction::Create {
            name,
            org_id,
            pairing_id,
            pairing_key,
        } => {
            let id = env
                .nodes()
                .create(NodeCreateParams {
                    name,
                    org_id,
                    pairing_id,
                    pairing_key,
                })
                .await?;
            println!("registration sent for node {id}");
        }
        NodeAction::Complete { name } => {
            let org = env.nodes().complete(&name).await?;
            println!("node {name} joined organization {} ({})", org.name, org.id);
        }
        NodeAction::Csrs { name } => {
            let created = env.nodes().create_csrs(&name).await?;
            println!("created {} CSRs", created.len());
        }
        NodeAction::Run { name } => print_report(&env.nodes().run(&name).await?),
        NodeAction::Certificates { name, export } => {
            let certs = env.nodes().certificates(&name).await?;
            for cert in &certs {
                println!("{} {}", cert.id, cert.name);
                if let Some(dir) = &export {
                    print_exported(&export_certificate(cert, dir).await?);
                }
            }
        }
        NodeAction::Register => print_report(&env.nodes().register().await?),
        NodeAction::Issue {
            node,
            ca,
            limit,
            keep_subject,
            tags,
        } => {
            let issued = env
                .nodes()
                .issue(NodeIssueParams {
                    node,
                    ca,
                    limit,
                    keep_subject,
                    tags,
                })
                .await?;
            println!("issued {} certificates", issued.len());
            print_names(&issued);
        }
        NodeAction::List => {
            for (name, id) in env.nodes().list().await? {
                println!("{id} {name}");
            }
        }
        NodeAction::Show { name } => {
            let info = env.nodes().show(&name).await?;
            println!("id: {}", info.public.id);
            println!("name: {}", info.public.name);
            println!("tags: {}", join_tags(&info.tags));
        }
        NodeAction::Delete(args) => {
            env.nodes().delete(delete_params(args)).await?;
            println!("node deleted");
        }
    }
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// X.509 resources
// ─────────────────────────────────────────────────────────────────────────────

async fn ca<B: Backend>(env: &Environment<B>, action: CaAction) -> Result<()> {
    match action {
        CaAction::Create {
            name,
            ca_expiry,
            cert_expiry,
            key_type,
            dn,
            import_cert,
            import_key,
            tags,
        } => {
            let ca = env
                .cas()
                .create(CaCreateParams {
                    name,
                    ca_expiry_days: ca_expiry,
                    cert_expiry_days: cert_expiry,
                    key_type,
                    dn: dn.into(),
                    import: import(import_cert, import_key),
                    tags,
                })
                .await?;
            println!("created CA {} ({})", ca.name, ca.id);
        }
        CaAction::List { tag } => print_names(&env.cas().list(tag.as_deref()).await?),
        CaAction::Show { name, export } => {
            let ca = env.cas().show(&name).await?;
            match export {
                Some(dir) => print_exported(&export_ca(&ca, &dir).await?),
                None => {
                    println!("id: {}", ca.id);
                    println!("name: {}", ca.name);
                    println!("key type: {}", ca.key_type);
                    println!("CA expiry days: {}", ca.ca_expiry_days);
                    println!("certificate expiry days: {}", ca.cert_expiry_days);
                    print!("{}", ca.certificate_pem);
                }
            }
        }
        CaAction::Update {
            name,
            cert,
            key,
            cert_expiry,
            dn,
            tags,
        } => {
            let ca = env
                .cas()
                .update(CaUpdateParams {
                    name,
                    certificate: cert,
                    key,
                    cert_expiry_days: cert_expiry,
                    dn: dn.into(),
                    tags,
                })
                .await?;
            println!("updated CA {}", ca.name);
        }
        CaAction::Delete(args) => {
            let id = env.cas().delete(delete_params(args)).await?;
            println!("deleted CA {id}");
        }
    }
    Ok(())
}

async fn cert<B: Backend>(env: &Environment<B>, action: CertAction) -> Result<()> {
    match action {
        CertAction::Create {
            name,
            ca,
            key_type,
            expiry,
            dn,
            import_cert,
            import_key,
            tags,
            standalone,
            export,
        } => {
            let cert = env
                .certificates()
                .create(CertCreateParams {
                    name,
                    ca,
                    key_type,
                    expiry_days: expiry,
                    dn: dn.into(),
                    import: import(import_cert, import_key),
                    tags,
                    standalone,
                })
                .await?;
            emit_certificate(&cert, export.as_deref(), standalone).await?;
        }
        CertAction::List { tag } => {
            print_names(&env.certificates().list(tag.as_deref()).await?)
        }
        CertAction::Show { name, export } => {
            let cert = env.certificates().show(&name).await?;
            emit_certificate(&cert, export.as_deref(), true).await?;
        }
        CertAction::Update {
            name,
            cert,
            key,
            tags,
        } => {
            let cert = env
                .certificates()
                .update(CertUpdateParams {
                    name,
                    certificate: cert,
                    key,
                    tags,
                })
                .await?;
            println!("updated certificate {}", cert.name);
        }
        CertAction::Delete(args) => {
            let id = env.certificates().delete(delete_params(args)).await?;
            println!("deleted certificate {id}");
        }
    }
    Ok(())
}

/// Export to `dir` when given, else print (in full when `verbose`).
async fn emit_certificate(cert: &Certificate, dir: Option<&Path>, verbose: bool) -> Result<()> {
    match dir {
        Some(dir) => print_exported(&export_certificate(cert, dir).await?),
        None if verbose => print_certificate(cert),
        None => println!("created certificate {} ({})", cert.name, cert.id),
    }
    Ok(())
}

async fn csr<B: Backend>(env: &Environment<B>, action: CsrAction) -> Result<()> {
    match action {
        CsrAction::Create {
            name,
            key_type,
            dn,
            import_csr,
            import_key,
            tags,
            standalone,
            export,
        } => {
            let csr = env
                .csrs()
                .create(CsrCreateParams {
                    name,
                    key_type,
                    dn: dn.into(),
                    import: import(import_csr, import_key),
                    tags,
                    standalone,
                })
                .await?;
            match export {
                Some(dir) => print_exported(&export_csr(&csr, &dir).await?),
                None if standalone => print_csr(&csr),
                None => println!("created CSR {} ({})", csr.name, csr.id),
            }
        }
        CsrAction::Sign {
            name,
            ca,
            keep_subject,
            cert_name,
            tags,
        } => {
            let cert = env
                .csrs()
                .sign(CsrSignParams {
                    name,
                    ca,
                    keep_subject,
                    certificate: cert_name,
                    tags,
                })
                .await?;
            println!("issued certificate {} ({})", cert.name, cert.id);
        }
        CsrAction::List { tag } => print_names(&env.csrs().list(tag.as_deref()).await?),
        CsrAction::Show { name, export } => {
            let csr = env.csrs().show(&name).await?;
            match export {
                Some(dir) => print_exported(&export_csr(&csr, &dir).await?),
                None => print_csr(&csr),
            }
        }
        CsrAction::Update {
            name,
            csr,
            key,
            tags,
        } => {
            let csr = env
                .csrs()
                .update(CsrUpdateParams {
                    name,
                    csr,
                    key,
                    tags,
                })
                .await?;
            println!("updated CSR {}", csr.name);
        }
        CsrAction::Delete(args) => {
            let id = env.csrs().delete(delete_params(args)).await?;
            println!("deleted CSR {id}");
        }
    }
    Ok(())
}

async fn pairing_key<B: Backend>(env: &Environment<B>, action: PairingKeyAction) -> Result<()> {
    match action {
        PairingKeyAction::New { tags } => {
            let key = env.pairing_keys().new_key(tags.as_deref()).await?;
            println!("pairing id: {}", key.id);
            println!("pairing key: {}", key.secret());
        }
        PairingKeyAction::List => {
            for (id, purpose, tags) in env.pairing_keys().list().await? {
                println!("{id} {purpose:?} [{}]", join_tags(&tags));
            }
        }
        PairingKeyAction::Show { id } => {
            let info = env.pairing_keys().show(&id).await?;
            println!("pairing id: {}", info.key.id);
            println!("pairing key: {}", info.key.secret());
            println!("purpose: {:?}", info.purpose);
        }
        PairingKeyAction::Delete { id, yes } => {
            if !yes {
                bail!("refusing to delete pairing key {id} without --yes");
            }
            env.pairing_keys().delete(&id, yes).await?;
            println!("pairing key deleted");
        }
    }
    Ok(())
}

//! PEM file import and export.

use std::path::{Path, PathBuf};

use tracing::info;
use trustroot_x509::{Ca, Certificate, Csr};

use crate::error::{Result, TrustError};

fn file_error(path: &Path) -> impl FnOnce(std::io::Error) -> TrustError + '_ {
    move |source| TrustError::File {
        path: path.to_path_buf(),
        source,
    }
}

/// Read a PEM file.
pub async fn read_pem(path: &Path) -> Result<String> {
    tokio::fs::read_to_string(path)
        .await
        .map_err(file_error(path))
}

/// Read an optional PEM file.
pub async fn read_optional_pem(path: Option<&Path>) -> Result<Option<String>> {
    match path {
        Some(path) => Ok(Some(read_pem(path).await?)),
        None => Ok(None),
    }
}

async fn write(dir: &Path, file: String, contents: &str) -> Result<PathBuf> {
    let path = dir.join(file);
    tokio::fs::write(&path, contents)
        .await
        .map_err(file_error(&path))?;
    Ok(path)
}

/// Write `<name>.crt`, `<name>.key` and `<name>.ca.crt` where present.
pub async fn export_certificate(cert: &Certificate, dir: &Path) -> Result<Vec<PathBuf>> {
    let mut written = vec![write(dir, format!("{}.crt", cert.name), &cert.certificate_pem).await?];
    if let Some(key) = &cert.private_key_pem {
        written.push(write(dir, format!("{}.key", cert.name), key).await?);
    }
    if let Some(ca) = &cert.ca_certificate_pem {
        written.push(write(dir, format!("{}.ca.crt", cert.name), ca).await?);
    }
    info!(name = %cert.name, files = written.len(), "exported certificate");
    Ok(written)
}

/// Write `<name>.crt` and, if held, `<name>.key`.
pub async fn export_ca(ca: &Ca, dir: &Path) -> Result<Vec<PathBuf>> {
    let mut written = vec![write(dir, format!("{}.crt", ca.name), &ca.certificate_pem).await?];
    if let Some(key) = &ca.private_key_pem {
        written.push(write(dir, format!("{}.key", ca.name), key).await?);
    }
    info!(name = %ca.name, files = written.len(), "exported CA");
    Ok(written)
}

/// Write `<name>.csr` and, if held, `<name>.key`.
pub async fn export_csr(csr: &Csr, dir: &Path) -> Result<Vec<PathBuf>> {
    let mut written = vec![write(dir, format!("{}.csr", csr.name), &csr.csr_pem).await?];
    if let Some(key) = &csr.private_key_pem {
        written.push(write(dir, format!("{}.key", csr.name), key).await?);
    }
    info!(name = %csr.name, files = written.len(), "exported CSR");
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use trustroot_x509::{DnScope, KeyType};

    #[tokio::test]
    async fn test_export_then_read() {
        let dir = tempfile::tempdir().unwrap();
        let cert =
            Certificate::generate("web", &DnScope::default(), KeyType::Ed25519, 5, None).unwrap();

        let written = export_certificate(&cert, dir.path()).await.unwrap();
        assert_eq!(written.len(), 2);
        let pem = read_pem(&dir.path().join("web.crt")).await.unwrap();
        assert_eq!(pem, cert.certificate_pem);
    }

    #[tokio::test]
    async fn test_missing_file_names_path() {
        let err = read_pem(Path::new("/nonexistent/web.crt")).await.unwrap_err();
        assert!(err.to_string().contains("/nonexistent/web.crt"));
        assert!(read_optional_pem(None).await.unwrap().is_none());
    }
}

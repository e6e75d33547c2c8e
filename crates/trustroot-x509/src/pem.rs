//! Inspection of PEM-encoded certificates and requests.

use x509_parser::pem::parse_x509_pem;
use x509_parser::prelude::{FromDer, X509CertificationRequest};

use crate::error::{Result, X509Error};

const SECONDS_PER_DAY: i64 = 86_400;

/// Validity window of a certificate, in unix seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Validity {
    pub not_before: i64,
    pub not_after: i64,
}

impl Validity {
    /// Whole days between `not_before` and `not_after`.
    pub fn days(&self) -> u32 {
        let days = (self.not_after - self.not_before) / SECONDS_PER_DAY;
        u32::try_from(days.max(0)).unwrap_or(u32::MAX)
    }
}

/// Read the validity window of a PEM certificate.
pub fn certificate_validity(pem: &str) -> Result<Validity> {
    let (_, pem) = parse_x509_pem(pem.as_bytes()).map_err(|e| X509Error::Pem(e.to_string()))?;
    let cert = pem
        .parse_x509()
        .map_err(|e| X509Error::Pem(e.to_string()))?;
    let validity = cert.validity();
    Ok(Validity {
        not_before: validity.not_before.timestamp(),
        not_after: validity.not_after.timestamp(),
    })
}

/// Check that `pem` holds a well-formed certification request.
pub fn check_request(pem: &str) -> Result<()> {
    let (_, pem) = parse_x509_pem(pem.as_bytes()).map_err(|e| X509Error::Pem(e.to_string()))?;
    if pem.label != "CERTIFICATE REQUEST" {
        return Err(X509Error::Pem(format!("expected a certificate request, found {}", pem.label)));
    }
    X509CertificationRequest::from_der(&pem.contents)
        .map_err(|e| X509Error::Pem(e.to_string()))?;
    Ok(())
}

/// Check that `pem` holds a parseable certificate.
pub fn check_certificate(pem: &str) -> Result<()> {
    certificate_validity(pem).map(|_| ())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn self_signed(days: i64) -> String {
        let mut params = rcgen::CertificateParams::new(vec!["test".to_string()]);
        params.alg = &rcgen::PKCS_ED25519;
        params.not_before = time::OffsetDateTime::now_utc();
        params.not_after = params.not_before + time::Duration::days(days);
        rcgen::Certificate::from_params(params)
            .unwrap()
            .serialize_pem()
            .unwrap()
    }

    #[test]
    fn test_validity_days() {
        let pem = self_signed(90);
        assert_eq!(certificate_validity(&pem).unwrap().days(), 90);
    }

    #[test]
    fn test_garbage_rejected() {
        assert!(matches!(certificate_validity("not a pem"), Err(X509Error::Pem(_))));
        assert!(check_request("not a pem").is_err());
    }

    #[test]
    fn test_certificate_is_not_a_request() {
        let pem = self_signed(1);
        assert!(check_certificate(&pem).is_ok());
        assert!(check_request(&pem).is_err());
    }
}

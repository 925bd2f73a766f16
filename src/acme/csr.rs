use crate::error::{IssueError, IssueResult};
use x509_parser::extensions::{GeneralName, ParsedExtension};
use x509_parser::pem::parse_x509_pem;
use x509_parser::prelude::{FromDer, X509CertificationRequest};

/// Domains requested by a CSR
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CsrDomains {
    pub common_name: Option<String>,
    pub alt_names: Vec<String>,
}

impl CsrDomains {
    /// Identifier list for the order: common name first, then alternative
    /// names, duplicates dropped (first occurrence wins)
    pub fn identifiers(&self) -> Vec<String> {
        let mut domains: Vec<String> = Vec::with_capacity(self.alt_names.len() + 1);
        for domain in self.common_name.iter().chain(self.alt_names.iter()) {
            if !domains.iter().any(|d| d == domain) {
                domains.push(domain.clone());
            }
        }
        domains
    }
}

/// Extract the subject common name and DNS subject-alternative names from a
/// PKCS#10 request, PEM or DER encoded
pub fn read_csr_domains(csr: &[u8]) -> IssueResult<CsrDomains> {
    let der = if csr.trim_ascii_start().starts_with(b"-----BEGIN") {
        let (_, pem) = parse_x509_pem(csr)
            .map_err(|e| IssueError::Csr(format!("failed to parse PEM: {:?}", e)))?;
        pem.contents
    } else {
        csr.to_vec()
    };

    let (_, request) = X509CertificationRequest::from_der(&der)
        .map_err(|e| IssueError::Csr(format!("failed to parse certification request: {}", e)))?;

    let common_name = request
        .certification_request_info
        .subject
        .iter_common_name()
        .next()
        .map(|cn| {
            cn.as_str()
                .map(str::to_string)
                .map_err(|e| IssueError::Csr(format!("unreadable common name: {}", e)))
        })
        .transpose()?;

    let mut alt_names = Vec::new();
    if let Some(extensions) = request.requested_extensions() {
        for extension in extensions {
            if let ParsedExtension::SubjectAlternativeName(san) = extension {
                for name in &san.general_names {
                    if let GeneralName::DNSName(dns) = name {
                        alt_names.push(dns.to_string());
                    }
                }
            }
        }
    }

    Ok(CsrDomains {
        common_name,
        alt_names,
    })
}

use std::net::Ipv4Addr;

use trust_dns_resolver::proto::rr::Name;

use crate::error::ScanError;

/// 解析用户输入的域名，并统一为绝对形式（以根结尾）
pub fn parse_domain(domain: &str) -> Result<Name, ScanError> {
    let mut name = Name::from_utf8(domain).map_err(|e| ScanError::InvalidDomain {
        domain: domain.to_string(),
        reason: e.to_string(),
    })?;
    name.set_fqdn(true);
    Ok(name)
}

/// 把子域名标签拼接到基础域名之前
///
/// 标签里可以带点（如 `"a.b"`），会先被拆成单独的标签，
/// 因此 `build_name(d, &["a.b"])` 与 `build_name(d, &["a", "b"])` 等价。
/// 结果总是绝对域名。
pub fn build_name<S: AsRef<str>>(base: &Name, subdomains: &[S]) -> Result<Name, ScanError> {
    let mut labels: Vec<Vec<u8>> = subdomains
        .iter()
        .flat_map(|sub| {
            sub.as_ref()
                .trim_matches('.')
                .split('.')
                .filter(|label| !label.is_empty())
                .map(|label| label.as_bytes().to_vec())
                .collect::<Vec<_>>()
        })
        .collect();
    labels.extend(base.iter().map(|label| label.to_vec()));

    let mut name = Name::from_labels(labels.iter().map(|label| label.as_slice())).map_err(|e| {
        ScanError::InvalidDomain {
            domain: subdomains
                .iter()
                .map(|s| s.as_ref())
                .collect::<Vec<_>>()
                .join("."),
            reason: e.to_string(),
        }
    })?;
    name.set_fqdn(true);
    Ok(name)
}

/// 去掉最左边的标签；根域名的父域仍是根
pub fn parent_name(name: &Name) -> Name {
    if name.num_labels() <= 1 {
        return Name::root();
    }
    let mut parent = name.base_name();
    parent.set_fqdn(true);
    parent
}

/// IPv4 地址对应的 in-addr.arpa 反向域名
pub fn reverse_name(ip: Ipv4Addr) -> Name {
    let [a, b, c, d] = ip.octets();
    let labels = [
        d.to_string(),
        c.to_string(),
        b.to_string(),
        a.to_string(),
        "in-addr".to_string(),
        "arpa".to_string(),
    ];
    let mut name = match Name::from_labels(labels.iter().map(|l| l.as_bytes())) {
        Ok(name) => name,
        // 数字标签不可能超长，这里只为满足类型
        Err(_) => Name::root(),
    };
    name.set_fqdn(true);
    name
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name(s: &str) -> Name {
        parse_domain(s).unwrap()
    }

    #[test]
    fn test_build_name_empty() {
        let domain = name("example.com.");
        let empty: [&str; 0] = [];
        assert_eq!(build_name(&domain, &empty).unwrap().to_string(), "example.com.");
    }

    #[test]
    fn test_build_name_makes_absolute() {
        let mut domain = Name::from_utf8("example.com").unwrap();
        domain.set_fqdn(false);
        let empty: [&str; 0] = [];
        let result = build_name(&domain, &empty).unwrap();
        assert!(result.is_fqdn());
        assert_eq!(result.to_string(), "example.com.");
    }

    #[test]
    fn test_build_name_single_and_multiple() {
        let domain = name("example.com.");
        assert_eq!(build_name(&domain, &["sd1"]).unwrap().to_string(), "sd1.example.com.");
        assert_eq!(
            build_name(&domain, &["sd1", "sd2"]).unwrap().to_string(),
            "sd1.sd2.example.com."
        );
    }

    #[test]
    fn test_build_name_flattens_dotted_labels() {
        let domain = name("example.com.");
        let dotted = build_name(&domain, &["sd1.sd2", "sd3.sd4"]).unwrap();
        let split = build_name(&domain, &["sd1", "sd2", "sd3", "sd4"]).unwrap();
        assert_eq!(dotted, split);
        assert_eq!(dotted.to_string(), "sd1.sd2.sd3.sd4.example.com.");
    }

    #[test]
    fn test_build_name_fqdn_subdomain() {
        let domain = name("example.");
        assert_eq!(
            build_name(&domain, &["sd1.sd2."]).unwrap().to_string(),
            "sd1.sd2.example."
        );
    }

    #[test]
    fn test_build_name_rejects_oversized_label() {
        let domain = name("example.com.");
        let long = "a".repeat(64);
        assert!(build_name(&domain, &[long]).is_err());
    }

    #[test]
    fn test_parent_name_walk() {
        let mut current = name("a.b.example.com.");
        let mut seen = vec![current.to_string()];
        while !current.is_root() {
            current = parent_name(&current);
            seen.push(current.to_string());
        }
        assert_eq!(
            seen,
            vec!["a.b.example.com.", "b.example.com.", "example.com.", "com.", "."]
        );
    }

    #[test]
    fn test_reverse_name() {
        let rev = reverse_name(Ipv4Addr::new(192, 168, 1, 10));
        assert_eq!(rev.to_string(), "10.1.168.192.in-addr.arpa.");
    }
}

use std::fs;
use std::net::Ipv4Addr;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use clap::{ArgAction, Parser};

use crate::api::ScanConfig;
use crate::dns_resolver::Transport;
use crate::error::ScanError;
use crate::expander::{parse_cidr, Expander};
use crate::names::parse_domain;
use crate::nearby::SearchFilter;
use crate::subdata;

/// 输出格式枚举
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Json,
    Csv,
    Txt,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(OutputFormat::Json),
            "csv" => Ok(OutputFormat::Csv),
            "txt" => Ok(OutputFormat::Txt),
            _ => Err(format!("不支持的输出格式: {}。支持的格式: json, csv, txt", s)),
        }
    }
}

/// 解析秒数，允许小数
pub fn parse_seconds(s: &str) -> Result<Duration, String> {
    let secs: f64 = s.trim().parse().map_err(|_| format!("invalid number of seconds: {}", s))?;
    Duration::try_from_secs_f64(secs).map_err(|_| format!("seconds must be a finite, non-negative number: {}", s))
}

#[derive(Parser, Debug)]
#[command(name = "rfierce")]
#[command(version)]
#[command(about = "A DNS reconnaissance tool for locating non-contiguous IP space", long_about = None, arg_required_else_help = true)]
pub struct Opts {
    /// domain name to test
    #[arg(short, long)]
    pub domain: Option<String>,

    /// attempt HTTP connection to non-RFC 1918 hosts
    #[arg(long)]
    pub connect: bool,

    /// scan entire class c of discovered records
    #[arg(long)]
    pub wide: bool,

    /// scan IPs near discovered records, this won't enter adjacent class c's
    #[arg(long, default_value_t = 5)]
    pub traverse: u32,

    /// filter on these domains when expanding lookup
    #[arg(long, num_args = 1..)]
    pub search: Vec<String>,

    /// scan an internal IP range, use cidr notation
    #[arg(long)]
    pub range: Option<String>,

    /// time to wait between lookups, in seconds
    #[arg(long, value_parser = parse_seconds)]
    pub delay: Option<Duration>,

    /// use these subdomains
    #[arg(long, num_args = 1.., conflicts_with = "subdomain_file")]
    pub subdomains: Vec<String>,

    /// use subdomains specified in this file (one per line)
    #[arg(long)]
    pub subdomain_file: Option<PathBuf>,

    /// use these dns servers for reverse lookups
    #[arg(long, num_args = 1.., conflicts_with = "dns_file")]
    pub dns_servers: Vec<String>,

    /// use dns servers specified in this file for reverse lookups (one per line)
    #[arg(long)]
    pub dns_file: Option<PathBuf>,

    /// use TCP instead of UDP
    #[arg(long)]
    pub tcp: bool,

    /// per-query timeout, in seconds
    #[arg(long, default_value = "3", value_parser = parse_seconds)]
    pub timeout: Duration,

    /// output file path
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// output format (json, csv, txt)
    #[arg(long, default_value = "json", value_parser = OutputFormat::from_str)]
    pub format: OutputFormat,

    /// suppress console results
    #[arg(short, long)]
    pub silent: bool,

    /// increase log verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

/// 读取字典文件，每行一项，忽略空行
pub fn load_word_list(path: &Path) -> Result<Vec<String>, ScanError> {
    let content = fs::read_to_string(path).map_err(|source| ScanError::WordList {
        path: path.to_path_buf(),
        source,
    })?;

    Ok(content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect())
}

pub fn parse_nameserver(s: &str) -> Result<Ipv4Addr, ScanError> {
    s.trim()
        .parse()
        .map_err(|_| ScanError::InvalidNameserver(s.to_string()))
}

fn parse_nameservers<S: AsRef<str>>(list: &[S]) -> Result<Vec<Ipv4Addr>, ScanError> {
    list.iter().map(|s| parse_nameserver(s.as_ref())).collect()
}

impl ScanConfig {
    /// 由命令行参数构造扫描配置
    ///
    /// 字典与名称服务器文件在这里一次性读入，文件缺失时直接返回错误。
    pub fn from_opts(opts: &Opts) -> Result<ScanConfig, ScanError> {
        if let Some(domain) = &opts.domain {
            parse_domain(domain)?;
        }

        let subdomains = if !opts.subdomains.is_empty() {
            opts.subdomains.clone()
        } else if let Some(path) = &opts.subdomain_file {
            load_word_list(path)?
        } else {
            subdata::get_default_sub_next_data()
                .into_iter()
                .map(str::to_string)
                .collect()
        };

        let nameservers = if !opts.dns_servers.is_empty() {
            parse_nameservers(&opts.dns_servers)?
        } else if let Some(path) = &opts.dns_file {
            parse_nameservers(&load_word_list(path)?)?
        } else {
            Vec::new()
        };

        let expander = if opts.wide {
            Expander::Wide
        } else if opts.traverse > 0 {
            Expander::Traverse(opts.traverse)
        } else {
            Expander::Default
        };

        let range = opts.range.as_deref().map(parse_cidr).transpose()?;
        let search = if opts.search.is_empty() {
            None
        } else {
            Some(SearchFilter::new(opts.search.clone()))
        };

        Ok(ScanConfig {
            domain: opts.domain.clone(),
            subdomains,
            nameservers,
            expander,
            range,
            search,
            connect: opts.connect,
            delay: opts.delay,
            transport: Transport::from_tcp_flag(opts.tcp),
            query_timeout: opts.timeout,
            concurrency: None,
            silent: opts.silent,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn opts(args: &[&str]) -> Opts {
        let mut argv = vec!["rfierce"];
        argv.extend_from_slice(args);
        Opts::try_parse_from(argv).unwrap()
    }

    fn temp_file(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_output_format_from_str() {
        assert_eq!("JSON".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
        assert_eq!("csv".parse::<OutputFormat>().unwrap(), OutputFormat::Csv);
        assert!("xml".parse::<OutputFormat>().is_err());
    }

    #[test]
    fn test_parse_seconds() {
        assert_eq!(parse_seconds("1.5").unwrap(), Duration::from_millis(1500));
        assert!(parse_seconds("-1").is_err());
        assert!(parse_seconds("soon").is_err());
    }

    #[test]
    fn test_load_word_list_skips_blank_lines() {
        let file = temp_file("www\n\n  mail \r\nftp\n");
        assert_eq!(load_word_list(file.path()).unwrap(), vec!["www", "mail", "ftp"]);
    }

    #[test]
    fn test_missing_word_list_is_fatal() {
        let result = load_word_list(Path::new("/nonexistent/rfierce/words.txt"));
        assert!(matches!(result, Err(ScanError::WordList { .. })));
    }

    #[test]
    fn test_defaults() {
        let config = ScanConfig::from_opts(&opts(&["--domain", "example.com"])).unwrap();
        assert_eq!(config.domain.as_deref(), Some("example.com"));
        assert_eq!(config.expander, Expander::Traverse(5));
        assert_eq!(config.transport, Transport::Udp);
        assert_eq!(config.query_timeout, Duration::from_secs(3));
        assert!(config.nameservers.is_empty());
        assert!(config.search.is_none());
        assert!(config.range.is_none());
        assert_eq!(config.subdomains.len(), subdata::get_default_sub_next_data().len());
    }

    #[test]
    fn test_expander_selection() {
        let config = ScanConfig::from_opts(&opts(&["-d", "example.com", "--traverse", "0"])).unwrap();
        assert_eq!(config.expander, Expander::Default);

        let config = ScanConfig::from_opts(&opts(&["-d", "example.com", "--traverse", "3", "--wide"])).unwrap();
        assert_eq!(config.expander, Expander::Wide);
    }

    #[test]
    fn test_explicit_subdomains_and_servers() {
        let config = ScanConfig::from_opts(&opts(&[
            "-d",
            "example.com",
            "--subdomains",
            "www",
            "mail",
            "--dns-servers",
            "8.8.8.8",
            "1.1.1.1",
            "--tcp",
        ]))
        .unwrap();
        assert_eq!(config.subdomains, vec!["www", "mail"]);
        assert_eq!(
            config.nameservers,
            vec![Ipv4Addr::new(8, 8, 8, 8), Ipv4Addr::new(1, 1, 1, 1)]
        );
        assert_eq!(config.transport, Transport::Tcp);
    }

    #[test]
    fn test_files_are_loaded() {
        let subs = temp_file("api\ndev\n");
        let servers = temp_file("9.9.9.9\n");
        let config = ScanConfig::from_opts(&opts(&[
            "-d",
            "example.com",
            "--subdomain-file",
            subs.path().to_str().unwrap(),
            "--dns-file",
            servers.path().to_str().unwrap(),
        ]))
        .unwrap();
        assert_eq!(config.subdomains, vec!["api", "dev"]);
        assert_eq!(config.nameservers, vec![Ipv4Addr::new(9, 9, 9, 9)]);
    }

    #[test]
    fn test_conflicting_sources_rejected() {
        let result = Opts::try_parse_from(["rfierce", "--subdomains", "www", "--subdomain-file", "x.txt"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_invalid_inputs() {
        let result = ScanConfig::from_opts(&opts(&["--range", "10.0.0.1/24"]));
        assert!(matches!(result, Err(ScanError::InvalidCidr(_))));

        let result = ScanConfig::from_opts(&opts(&["-d", "example.com", "--dns-servers", "dns.google"]));
        assert!(matches!(result, Err(ScanError::InvalidNameserver(_))));
    }

    #[test]
    fn test_range_and_search() {
        let config = ScanConfig::from_opts(&opts(&["--range", "10.0.0.0/30", "--search", "corp", "internal"])).unwrap();
        assert!(config.domain.is_none());
        assert_eq!(config.range.unwrap().iter().count(), 4);
        assert!(config.search.unwrap().accepts("host.internal.example"));
    }
}

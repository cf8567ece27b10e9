use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use async_trait::async_trait;
use log::{debug, trace};
use tokio::net::{TcpStream, UdpSocket};
use tokio::time::timeout;
use trust_dns_client::client::{AsyncClient, ClientHandle};
use trust_dns_client::error::{ClientError, ClientErrorKind};
use trust_dns_client::proto::error::{ProtoError, ProtoErrorKind};
use trust_dns_client::proto::iocompat::AsyncIoTokioAsStd;
use trust_dns_client::tcp::TcpClientStream;
use trust_dns_client::udp::UdpClientStream;
use trust_dns_resolver::config::ResolverConfig;
use trust_dns_resolver::proto::op::{Message, ResponseCode};
use trust_dns_resolver::proto::rr::{DNSClass, Name, RecordType};
use trust_dns_resolver::system_conf;

use crate::error::ResolveError;

/// DNS 标准端口
pub const DNS_PORT: u16 = 53;

/// 查询使用的传输协议
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Transport {
    #[default]
    Udp,
    Tcp,
}

impl Transport {
    pub fn from_tcp_flag(tcp: bool) -> Self {
        if tcp {
            Transport::Tcp
        } else {
            Transport::Udp
        }
    }
}

/// 单次DNS查询能力
///
/// 名称服务器列表作为参数传入，引用跟随只影响当前这一次查询，
/// 不会改动共享的解析器配置。
#[async_trait]
pub trait ResolverClient: Send + Sync {
    /// 当前配置的名称服务器
    fn nameservers(&self) -> Vec<Ipv4Addr>;

    /// 向给定的名称服务器发出一次查询，返回完整的响应报文
    async fn query(
        &self,
        name: &Name,
        record_type: RecordType,
        transport: Transport,
        nameservers: &[Ipv4Addr],
    ) -> Result<Message, ResolveError>;
}

/// 基于 `AsyncClient` 的解析器，逐个服务器发出 UDP 或 TCP 查询
#[derive(Debug, Clone)]
pub struct NetworkResolver {
    nameservers: Vec<Ipv4Addr>,
    timeout: Duration,
    port: u16,
}

/// 单个服务器的交互结果
enum Exchange {
    Response(Message),
    Timeout,
    Failed,
}

impl NetworkResolver {
    pub fn new(nameservers: Vec<Ipv4Addr>, timeout: Duration) -> Self {
        NetworkResolver {
            nameservers,
            timeout,
            port: DNS_PORT,
        }
    }

    /// 使用系统配置的名称服务器
    pub fn from_system(timeout: Duration) -> Self {
        Self::new(system_nameservers(), timeout)
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// 建立到单个服务器的 UDP 客户端，本地套接字在这里绑定
    async fn udp_client(&self, server: SocketAddr) -> Result<AsyncClient, ProtoError> {
        let stream = UdpClientStream::<UdpSocket>::with_timeout(server, self.timeout);
        let (client, background) = AsyncClient::connect(stream).await?;
        tokio::spawn(background);
        Ok(client)
    }

    /// 建立到单个服务器的 TCP 客户端
    pub(crate) async fn tcp_client(&self, server: SocketAddr) -> Result<AsyncClient, ProtoError> {
        let (stream, sender) =
            TcpClientStream::<AsyncIoTokioAsStd<TcpStream>>::with_timeout(server, self.timeout);
        let (client, background) = AsyncClient::new(stream, sender, None).await?;
        tokio::spawn(background);
        Ok(client)
    }

    /// 与单个服务器完成一次问答
    ///
    /// UDP 客户端无法建立（本地绑定失败）是致命错误；
    /// TCP 连接失败只影响这一台服务器。
    async fn exchange(
        &self,
        server: SocketAddr,
        name: &Name,
        record_type: RecordType,
        transport: Transport,
    ) -> Result<Exchange, ResolveError> {
        let mut client = match transport {
            Transport::Udp => self.udp_client(server).await?,
            Transport::Tcp => match timeout(self.timeout, self.tcp_client(server)).await {
                Ok(Ok(client)) => client,
                Ok(Err(e)) => return Ok(Exchange::from_error(server, &ClientError::from(e))),
                Err(_) => return Ok(Exchange::Timeout),
            },
        };

        let response = timeout(self.timeout, client.query(name.clone(), DNSClass::IN, record_type)).await;
        Ok(match response {
            Ok(Ok(response)) => Exchange::Response(Message::clone(&response)),
            Ok(Err(e)) => Exchange::from_error(server, &e),
            Err(_) => Exchange::Timeout,
        })
    }
}

impl Exchange {
    fn from_error(server: SocketAddr, e: &ClientError) -> Self {
        let timed_out = match e.kind() {
            ClientErrorKind::Timeout => true,
            ClientErrorKind::Proto(p) => matches!(p.kind(), ProtoErrorKind::Timeout),
            _ => false,
        };
        if timed_out {
            Exchange::Timeout
        } else {
            debug!("exchange with {} failed: {}", server, e);
            Exchange::Failed
        }
    }
}

#[async_trait]
impl ResolverClient for NetworkResolver {
    fn nameservers(&self) -> Vec<Ipv4Addr> {
        self.nameservers.clone()
    }

    async fn query(
        &self,
        name: &Name,
        record_type: RecordType,
        transport: Transport,
        nameservers: &[Ipv4Addr],
    ) -> Result<Message, ResolveError> {
        let mut all_timed_out = !nameservers.is_empty();
        for &server_ip in nameservers {
            let server = SocketAddr::new(IpAddr::V4(server_ip), self.port);
            trace!("{} {} -> {} ({:?})", name, record_type, server, transport);

            let mut exchange = self.exchange(server, name, record_type, transport).await?;

            // UDP 应答被截断时改用 TCP 重试
            if let Exchange::Response(message) = &exchange {
                if message.truncated() && transport == Transport::Udp {
                    debug!("truncated answer from {}, retrying over TCP", server);
                    exchange = self.exchange(server, name, record_type, Transport::Tcp).await?;
                }
            }

            match exchange {
                Exchange::Response(message) => match message.response_code() {
                    ResponseCode::NoError => return Ok(message),
                    ResponseCode::NXDomain => return Err(ResolveError::NxDomain(name.to_string())),
                    code => {
                        debug!("{} answered {} for {}", server, code, name);
                        all_timed_out = false;
                    }
                },
                Exchange::Timeout => debug!("{} timed out for {}", server, name),
                Exchange::Failed => all_timed_out = false,
            }
        }

        if all_timed_out {
            Err(ResolveError::Timeout(name.to_string()))
        } else {
            Err(ResolveError::NoNameservers(name.to_string()))
        }
    }
}

/// 读取系统配置中的 IPv4 名称服务器，读取失败或为空时回落到公共DNS
pub fn system_nameservers() -> Vec<Ipv4Addr> {
    let from_system = match system_conf::read_system_conf() {
        Ok((config, _)) => ipv4_nameservers(&config),
        Err(e) => {
            debug!("could not read system resolver configuration: {}", e);
            Vec::new()
        }
    };

    if from_system.is_empty() {
        ipv4_nameservers(&ResolverConfig::google())
    } else {
        from_system
    }
}

fn ipv4_nameservers(config: &ResolverConfig) -> Vec<Ipv4Addr> {
    let mut servers = Vec::new();
    for ns in config.name_servers() {
        if let IpAddr::V4(ip) = ns.socket_addr.ip() {
            // 同一地址通常同时以 UDP 和 TCP 两种配置出现
            if !servers.contains(&ip) {
                servers.push(ip);
            }
        }
    }
    servers
}

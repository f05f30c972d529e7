use anyhow::Result;
use std::fs;
use std::io::{Read, Write};
use std::os::unix::net::{UnixListener, UnixStream};
use std::path::PathBuf;
use std::thread;

use pagehole::config::ScanConfig;
use pagehole::ctl::CtlServer;
use pagehole::util::system_page_size;

#[test]
fn round_trip_scan_over_the_socket() -> Result<()> {
    let root = unique_root("roundtrip");
    fs::create_dir_all(&root)?;

    let data = root.join("data.bin");
    fs::write(&data, vec![0x42u8; 8 * system_page_size()])?;

    let socket = root.join("ctl.sock");
    let cfg = ScanConfig::default()
        .with_target_index(3)
        .with_window_pages(Some(4));

    let server = CtlServer::bind(&socket)?;
    let handle = thread::spawn(move || {
        let _ = server.handle_next(&cfg);
        server // keep the socket alive until the client is done
    });

    let reply = request(&socket, format!("{}\n", data.display()).as_bytes())?;
    let _server = handle.join().expect("server thread");

    assert!(
        reply.starts_with("left boundary:"),
        "unexpected reply: {reply}"
    );
    assert!(reply.contains("target index:   3"));
    assert!(reply.contains("missing pages:"));
    Ok(())
}

#[test]
fn overlong_line_is_rejected_at_the_transport() -> Result<()> {
    let root = unique_root("overlong");
    fs::create_dir_all(&root)?;
    let socket = root.join("ctl.sock");
    let cfg = ScanConfig::default();

    let server = CtlServer::bind(&socket)?;
    let handle = thread::spawn(move || {
        let _ = server.handle_next(&cfg);
        server
    });

    let mut line = vec![b'x'; 300];
    line.push(b'\n');
    let reply = request(&socket, &line)?;
    let _server = handle.join().expect("server thread");

    assert!(reply.starts_with("ERR path-too-long"), "got: {reply}");
    Ok(())
}

#[test]
fn bare_newline_is_an_empty_path() -> Result<()> {
    let root = unique_root("emptyline");
    fs::create_dir_all(&root)?;
    let socket = root.join("ctl.sock");
    let cfg = ScanConfig::default();

    let server = CtlServer::bind(&socket)?;
    let handle = thread::spawn(move || {
        let _ = server.handle_next(&cfg);
        server
    });

    let reply = request(&socket, b"\n")?;
    let _server = handle.join().expect("server thread");

    assert!(reply.starts_with("ERR empty-path"), "got: {reply}");
    Ok(())
}

#[test]
fn unresolvable_path_reports_its_kind() -> Result<()> {
    let root = unique_root("badpath");
    fs::create_dir_all(&root)?;
    let socket = root.join("ctl.sock");
    let cfg = ScanConfig::default();

    let server = CtlServer::bind(&socket)?;
    let handle = thread::spawn(move || {
        let _ = server.handle_next(&cfg);
        server
    });

    let bogus = root.join("nope.dat");
    let reply = request(&socket, format!("{}\n", bogus.display()).as_bytes())?;
    let _server = handle.join().expect("server thread");

    assert!(reply.starts_with("ERR path-resolution-failed"), "got: {reply}");
    Ok(())
}

#[test]
fn stale_socket_file_is_replaced_on_bind() -> Result<()> {
    let root = unique_root("stale");
    fs::create_dir_all(&root)?;
    let socket = root.join("ctl.sock");

    // A dead server leaves the socket file behind: simulate by binding a
    // plain listener and dropping it (drop does not unlink the path).
    {
        let _stale = UnixListener::bind(&socket)?;
    }
    assert!(socket.exists());

    let server = CtlServer::bind(&socket)?;
    assert!(socket.exists());
    drop(server);
    // The RAII guard unlinks its socket on the way out.
    assert!(!socket.exists());
    Ok(())
}

#[test]
fn second_instance_on_the_same_socket_is_refused() -> Result<()> {
    let root = unique_root("locked");
    fs::create_dir_all(&root)?;
    let socket = root.join("ctl.sock");

    let _server = CtlServer::bind(&socket)?;
    assert!(CtlServer::bind(&socket).is_err());
    Ok(())
}

fn request(socket: &PathBuf, line: &[u8]) -> Result<String> {
    let mut stream = UnixStream::connect(socket)?;
    stream.write_all(line)?;
    stream.shutdown(std::net::Shutdown::Write)?;
    let mut reply = String::new();
    stream.read_to_string(&mut reply)?;
    Ok(reply)
}

fn unique_root(prefix: &str) -> PathBuf {
    let pid = std::process::id();
    let t = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    std::env::temp_dir().join(format!("pagehole-ctl-{}-{}-{}", prefix, pid, t))
}

//! In-process Redis stand-in for transport tests
//!
//! Speaks just enough RESP for the sink: every command is logged per
//! connection, PUBLISH and LPUSH get `:1`, everything else `+OK`.

use std::io::{self, BufRead, BufReader, Read, Write};
use std::net::{Shutdown, TcpListener, TcpStream};
use std::sync::{Arc, Mutex};
use std::thread;

type CommandLog = Arc<Mutex<Vec<(usize, Vec<String>)>>>;

pub(crate) struct FakeRedis {
    port: u16,
    log: CommandLog,
}

impl FakeRedis {
    /// Starts a server; with `drop_first_connection` the first client
    /// connection is closed right after its first write command is answered.
    pub(crate) fn start(drop_first_connection: bool) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let log = CommandLog::default();

        let server_log = log.clone();
        thread::spawn(move || {
            for (id, stream) in listener.incoming().enumerate() {
                let Ok(stream) = stream else { break };
                let log = server_log.clone();
                let drop_after_write = drop_first_connection && id == 0;
                thread::spawn(move || serve(id, stream, log, drop_after_write).ok());
            }
        });

        Self { port, log }
    }

    pub(crate) fn port(&self) -> u16 {
        self.port
    }

    /// Commands seen on one connection, client handshake commands left out
    pub(crate) fn commands_on(&self, connection: usize) -> Vec<Vec<String>> {
        self.log
            .lock()
            .unwrap()
            .iter()
            .filter(|(id, command)| *id == connection && !is_command(command, "CLIENT"))
            .map(|(_, command)| command.clone())
            .collect()
    }
}

fn is_command(command: &[String], name: &str) -> bool {
    command
        .first()
        .is_some_and(|first| first.eq_ignore_ascii_case(name))
}

fn serve(id: usize, stream: TcpStream, log: CommandLog, drop_after_write: bool) -> io::Result<()> {
    let mut reader = BufReader::new(stream.try_clone()?);
    let mut writer = stream;

    while let Some(command) = read_command(&mut reader)? {
        let write = is_command(&command, "PUBLISH") || is_command(&command, "LPUSH");
        log.lock().unwrap().push((id, command));

        let reply: &[u8] = if write { b":1\r\n" } else { b"+OK\r\n" };
        writer.write_all(reply)?;
        if write && drop_after_write {
            return writer.shutdown(Shutdown::Both);
        }
    }
    Ok(())
}

fn read_command(reader: &mut impl BufRead) -> io::Result<Option<Vec<String>>> {
    let mut line = String::new();
    if reader.read_line(&mut line)? == 0 {
        return Ok(None);
    }
    let count = parse_header(&line, '*')?;

    let mut args = Vec::with_capacity(count);
    for _ in 0..count {
        line.clear();
        reader.read_line(&mut line)?;
        let len = parse_header(&line, '$')?;

        let mut buf = vec![0; len + 2];
        reader.read_exact(&mut buf)?;
        buf.truncate(len);
        args.push(String::from_utf8_lossy(&buf).into_owned());
    }
    Ok(Some(args))
}

fn parse_header(line: &str, prefix: char) -> io::Result<usize> {
    line.trim_end()
        .strip_prefix(prefix)
        .and_then(|n| n.parse().ok())
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidData, line.to_string()))
}

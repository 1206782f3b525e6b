/*!
 * Connection Engine
 *
 * Thread-per-connection TCP server: the accept loop spawns one OS thread
 * per socket, and each thread runs a blocking read-dispatch-write loop
 * until the client disconnects, the codec reports an error, or a handler
 * ends the session.
 */

use crate::aof::Aof;
use crate::commands::{self, Registry};
use crate::config::ServerConfig;
use crate::error::Result;
use crate::resp::{Reader, Writer};
use crate::store::Store;
use log::{debug, info, warn};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::Arc;
use std::thread;

/// A predicate consulted once at connection establishment; returning
/// false terminates the connection before a single byte is read.
pub type AcceptFilter = dyn Fn(&SocketAddr) -> bool + Send + Sync;

pub struct Server {
    store: Arc<Store>,
    registry: Arc<Registry>,
    aof: Option<Arc<Aof>>,
    accept_filter: Option<Arc<AcceptFilter>>,
}

impl Server {
    /// Builds the registry, and — if `config.enable_aof` — opens the AOF
    /// (which launches its own background fsync thread, see `Aof::open`)
    /// and replays it into the store. Does not start accepting
    /// connections.
    pub fn bootstrap(config: &ServerConfig) -> Result<Server> {
        let store = Arc::new(Store::new());
        let registry = Arc::new(Registry::with_defaults());

        let aof = if config.enable_aof {
            let aof = Aof::open(&config.aof_file)?;
            info!("replaying aof from {}", config.aof_file.display());
            aof.replay(&store, &registry)?;
            Some(aof)
        } else {
            None
        };

        Ok(Server {
            store,
            registry,
            aof,
            accept_filter: None,
        })
    }

    pub fn store(&self) -> &Arc<Store> {
        &self.store
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    pub fn aof(&self) -> Option<&Arc<Aof>> {
        self.aof.as_ref()
    }

    /// Installs the single optional accept-time predicate.
    pub fn set_accept_filter(
        &mut self,
        filter: impl Fn(&SocketAddr) -> bool + Send + Sync + 'static,
    ) {
        self.accept_filter = Some(Arc::new(filter));
    }

    /// Binds `addr` and accepts connections until the listener itself
    /// errors, spawning one thread per accepted socket.
    pub fn run(&self, addr: SocketAddr) -> Result<()> {
        let listener = TcpListener::bind(addr)?;
        info!("listening on {}", addr);
        self.run_on(listener)
    }

    /// Same accept loop as `run`, but against an already-bound listener.
    /// Lets an embedder (or a test) choose an ephemeral port with
    /// `TcpListener::bind("127.0.0.1:0")`, learn the assigned address via
    /// `local_addr()`, and only then hand the listener over here — while
    /// still exercising the real dispatch-and-append path.
    pub fn run_on(&self, listener: TcpListener) -> Result<()> {
        for stream in listener.incoming() {
            let stream = match stream {
                Ok(s) => s,
                Err(e) => {
                    warn!("accept failed: {}", e);
                    continue;
                }
            };

            if let Some(filter) = &self.accept_filter {
                if let Ok(peer) = stream.peer_addr() {
                    if !filter(&peer) {
                        debug!("rejected connection from {}", peer);
                        continue;
                    }
                }
            }

            let store = Arc::clone(&self.store);
            let registry = Arc::clone(&self.registry);
            let aof = self.aof.clone();
            thread::spawn(move || {
                if let Err(e) = handle_connection(stream, &store, &registry, aof.as_deref()) {
                    debug!("connection ended: {}", e);
                }
            });
        }

        Ok(())
    }
}

fn handle_connection(
    stream: TcpStream,
    store: &Store,
    registry: &Registry,
    aof: Option<&Aof>,
) -> Result<()> {
    stream.set_nodelay(true).ok();
    let peer = stream.peer_addr().ok();
    let read_half = stream.try_clone()?;
    let mut reader = Reader::new(read_half);
    let mut writer = Writer::new(stream);

    loop {
        let request = match reader.read_value() {
            Ok(v) => v,
            Err(_) => break,
        };

        let items = match request.as_array() {
            Some(items) => items,
            None => continue,
        };

        let name = match items.first().and_then(|v| v.as_bulk()) {
            Some(b) => b,
            None => continue,
        };

        let descriptor = match registry.lookup(name) {
            Some(d) => d,
            None => {
                let upper: String = name.iter().map(|b| b.to_ascii_uppercase() as char).collect();
                writer.write_value(&commands::unknown_command_error(&upper))?;
                writer.flush()?;
                continue;
            }
        };

        let (response, keep_going) = descriptor.invoke(store, &items[1..]);
        writer.write_value(&response)?;
        writer.flush()?;

        if descriptor.mutating {
            if let Some(aof) = aof {
                aof.append(&request)?;
            }
        }

        if !keep_going {
            break;
        }
    }

    debug!("connection from {:?} closed", peer);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resp::Value;
    use std::io::{Read, Write};
    use std::net::TcpStream as ClientStream;
    use std::time::Duration;

    fn spawn_test_server() -> SocketAddr {
        let config = ServerConfig {
            bind_addr: "127.0.0.1:0".parse().unwrap(),
            enable_aof: false,
            aof_file: "unused.aof".into(),
        };
        let server = Server::bootstrap(&config).unwrap();
        let listener = TcpListener::bind(config.bind_addr).unwrap();
        let addr = listener.local_addr().unwrap();
        thread::spawn(move || {
            let _ = server.run_on(listener);
        });
        addr
    }

    fn roundtrip(stream: &mut ClientStream, request: &[u8]) -> Value {
        stream.write_all(request).unwrap();
        let mut reader = Reader::new(stream.try_clone().unwrap());
        reader.read_value().unwrap()
    }

    #[test]
    fn set_then_get_over_a_real_socket() {
        let addr = spawn_test_server();
        thread::sleep(Duration::from_millis(50));
        let mut stream = ClientStream::connect(addr).unwrap();
        stream.set_read_timeout(Some(Duration::from_secs(2))).unwrap();

        let set = b"*3\r\n$3\r\nSET\r\n$3\r\nfoo\r\n$3\r\nbar\r\n";
        assert_eq!(roundtrip(&mut stream, set), Value::SimpleString("OK".into()));

        let get = b"*2\r\n$3\r\nGET\r\n$3\r\nfoo\r\n";
        assert_eq!(roundtrip(&mut stream, get), Value::bulk(b"bar".to_vec()));
    }

    #[test]
    fn unknown_command_over_a_real_socket() {
        let addr = spawn_test_server();
        thread::sleep(Duration::from_millis(50));
        let mut stream = ClientStream::connect(addr).unwrap();
        stream.set_read_timeout(Some(Duration::from_secs(2))).unwrap();

        let bogus = b"*1\r\n$3\r\nFOO\r\n";
        assert_eq!(
            roundtrip(&mut stream, bogus),
            Value::Error("ERR unknown command \"FOO\"".into())
        );
    }

    #[allow(dead_code)]
    fn assert_read_closes(mut stream: ClientStream) {
        let mut buf = [0u8; 1];
        let _ = stream.read(&mut buf);
    }
}

/*!
 * Command Registry and Handlers
 *
 * A case-insensitive mapping from command name to a descriptor carrying
 * a handler function and a `mutating` flag. The flag governs whether the
 * connection engine appends the original request to the AOF after the
 * handler runs (see `server::handle_connection`).
 */

use crate::resp::Value;
use crate::store::Store;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

/// A handler receives the store and the request arguments (the command
/// name itself is not included) and returns the response to write plus
/// a continue-session flag. All handlers bundled with this crate return
/// `true`; the flag exists for extensions (e.g. a QUIT command) that
/// close the connection after replying.
pub type HandlerFn = dyn Fn(&Store, &[Value]) -> (Value, bool) + Send + Sync;

pub struct CommandDescriptor {
    pub name: String,
    pub mutating: bool,
    handler: Box<HandlerFn>,
}

impl CommandDescriptor {
    pub fn invoke(&self, store: &Store, args: &[Value]) -> (Value, bool) {
        (self.handler)(store, args)
    }
}

/// The case-insensitive command table. Built at startup with the default
/// command set, then effectively immutable — `register` exists for
/// embedders that want to extend it, guarded by the same lock dispatch
/// reads through.
pub struct Registry {
    commands: RwLock<HashMap<String, Arc<CommandDescriptor>>>,
}

impl Registry {
    pub fn new() -> Self {
        Registry {
            commands: RwLock::new(HashMap::new()),
        }
    }

    /// Builds a registry pre-populated with PING/SET/GET/DEL/EXISTS and
    /// the HSET/HGET/HGETALL/HDEL/HLEN/HKEYS/HVALS hash commands.
    pub fn with_defaults() -> Self {
        let registry = Registry::new();
        registry.install_defaults();
        registry
    }

    fn install_defaults(&self) {
        self.register("PING", false, handlers::ping);
        self.register("SET", true, handlers::set);
        self.register("GET", false, handlers::get);
        self.register("DEL", true, handlers::del);
        self.register("EXISTS", false, handlers::exists);
        self.register("HSET", true, handlers::hset);
        self.register("HGET", false, handlers::hget);
        self.register("HGETALL", false, handlers::hgetall);
        self.register("HDEL", true, handlers::hdel);
        self.register("HLEN", false, handlers::hlen);
        self.register("HKEYS", false, handlers::hkeys);
        self.register("HVALS", false, handlers::hvals);
    }

    /// Installs a descriptor under an uppercased name. Guarded by the
    /// write half of the same lock `lookup` reads through, so concurrent
    /// dispatch never observes a partially-inserted entry.
    pub fn register(
        &self,
        name: &str,
        mutating: bool,
        handler: impl Fn(&Store, &[Value]) -> (Value, bool) + Send + Sync + 'static,
    ) {
        let name = name.to_ascii_uppercase();
        let descriptor = Arc::new(CommandDescriptor {
            name: name.clone(),
            mutating,
            handler: Box::new(handler),
        });
        self.commands.write().insert(name, descriptor);
    }

    /// Looks up a command by name (case-insensitive).
    pub fn lookup(&self, name: &[u8]) -> Option<Arc<CommandDescriptor>> {
        let upper = upper_ascii(name);
        self.commands.read().get(&upper).cloned()
    }
}

impl Default for Registry {
    fn default() -> Self {
        Registry::with_defaults()
    }
}

fn upper_ascii(name: &[u8]) -> String {
    name.iter().map(|b| b.to_ascii_uppercase() as char).collect()
}

/// Builds the exact arity-violation error text the spec mandates.
pub fn arity_error(cmd_lower: &str) -> Value {
    Value::Error(format!(
        "ERR wrong number of arguments for '{}' command",
        cmd_lower
    ))
}

/// Builds the exact unknown-command error text the spec mandates.
pub fn unknown_command_error(name_upper: &str) -> Value {
    Value::Error(format!("ERR unknown command \"{}\"", name_upper))
}

fn arg_bytes(v: &Value) -> &[u8] {
    v.as_bulk().unwrap_or(&[])
}

mod handlers {
    use super::{arg_bytes, arity_error};
    use crate::resp::Value;
    use crate::store::Store;

    /// `PING [message]` — replies `PONG`, or echoes `message` if given.
    pub fn ping(_store: &Store, args: &[Value]) -> (Value, bool) {
        if args.len() > 1 {
            return (arity_error("ping"), true);
        }
        let text = match args.first() {
            Some(v) => String::from_utf8_lossy(arg_bytes(v)).into_owned(),
            None => "PONG".to_string(),
        };
        (Value::SimpleString(text), true)
    }

    /// `SET key value` — overwrites `key`. Always replies `+OK`.
    pub fn set(store: &Store, args: &[Value]) -> (Value, bool) {
        if args.len() != 2 {
            return (arity_error("set"), true);
        }
        store.set(arg_bytes(&args[0]).to_vec(), arg_bytes(&args[1]).to_vec());
        (Value::SimpleString("OK".into()), true)
    }

    /// `GET key` — bulk reply, or a null bulk if `key` isn't set.
    pub fn get(store: &Store, args: &[Value]) -> (Value, bool) {
        if args.len() != 1 {
            return (arity_error("get"), true);
        }
        (Value::BulkString(store.get(arg_bytes(&args[0]))), true)
    }

    /// `DEL key` — integer reply: `1` if the key was present, else `0`.
    pub fn del(store: &Store, args: &[Value]) -> (Value, bool) {
        if args.len() != 1 {
            return (arity_error("del"), true);
        }
        let removed = store.delete(arg_bytes(&args[0]));
        (Value::Integer(removed as i64), true)
    }

    /// `EXISTS key` — integer reply: `1` if set, else `0`.
    pub fn exists(store: &Store, args: &[Value]) -> (Value, bool) {
        if args.len() != 1 {
            return (arity_error("exists"), true);
        }
        (Value::Integer(store.exists(arg_bytes(&args[0])) as i64), true)
    }

    /// `HSET key field value` — sets `field` in the hash at `key`,
    /// creating the hash if absent. Always replies `1`.
    pub fn hset(store: &Store, args: &[Value]) -> (Value, bool) {
        if args.len() != 3 {
            return (arity_error("hset"), true);
        }
        store.hset(arg_bytes(&args[0]), arg_bytes(&args[1]), arg_bytes(&args[2]).to_vec());
        // The wire contract always reports 1 on a successful call; see
        // the HSET open-question resolution in DESIGN.md.
        (Value::Integer(1), true)
    }

    /// `HGET key field` — bulk reply, or a null bulk if the hash or the
    /// field is absent.
    pub fn hget(store: &Store, args: &[Value]) -> (Value, bool) {
        if args.len() != 2 {
            return (arity_error("hget"), true);
        }
        (
            Value::BulkString(store.hget(arg_bytes(&args[0]), arg_bytes(&args[1]))),
            true,
        )
    }

    /// `HGETALL key` — flat array of alternating field/value bulks, or a
    /// null array if the hash doesn't exist.
    pub fn hgetall(store: &Store, args: &[Value]) -> (Value, bool) {
        if args.len() != 1 {
            return (arity_error("hgetall"), true);
        }
        match store.hgetall(arg_bytes(&args[0])) {
            Some(pairs) => {
                let mut items = Vec::with_capacity(pairs.len() * 2);
                for (field, value) in pairs {
                    items.push(Value::bulk(field));
                    items.push(Value::bulk(value));
                }
                (Value::array(items), true)
            }
            None => (Value::Array(None), true),
        }
    }

    /// `HDEL key field` — integer reply: `1` if the field was present,
    /// else `0`.
    pub fn hdel(store: &Store, args: &[Value]) -> (Value, bool) {
        if args.len() != 2 {
            return (arity_error("hdel"), true);
        }
        let removed = store.hdel(arg_bytes(&args[0]), arg_bytes(&args[1]));
        (Value::Integer(removed as i64), true)
    }

    /// `HLEN key` — integer reply: field count, or `0` if absent.
    pub fn hlen(store: &Store, args: &[Value]) -> (Value, bool) {
        if args.len() != 1 {
            return (arity_error("hlen"), true);
        }
        (Value::Integer(store.hlen(arg_bytes(&args[0]))), true)
    }

    /// `HKEYS key` — array of field-name bulks, or a null array if the
    /// hash doesn't exist.
    pub fn hkeys(store: &Store, args: &[Value]) -> (Value, bool) {
        if args.len() != 1 {
            return (arity_error("hkeys"), true);
        }
        match store.hkeys(arg_bytes(&args[0])) {
            Some(keys) => (Value::array(keys.into_iter().map(Value::bulk).collect()), true),
            None => (Value::Array(None), true),
        }
    }

    /// `HVALS key` — array of value bulks, or a null array if the hash
    /// doesn't exist.
    pub fn hvals(store: &Store, args: &[Value]) -> (Value, bool) {
        if args.len() != 1 {
            return (arity_error("hvals"), true);
        }
        match store.hvals(arg_bytes(&args[0])) {
            Some(vals) => (Value::array(vals.into_iter().map(Value::bulk).collect()), true),
            None => (Value::Array(None), true),
        }
    }
}

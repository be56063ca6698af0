//! # Connections registry
//!
//! Tracks every currently-open connection and owns the single shared `Dispatcher` instance.
//! There is one `Connections` per running server.
use super::Connection;
use crate::{db::Db, dispatcher::Dispatcher};
use parking_lot::RwLock;
use std::{collections::BTreeMap, net::SocketAddr, sync::Arc};

/// Registry of every currently-open connection.
#[derive(Debug)]
pub struct Connections {
    connections: RwLock<BTreeMap<u128, Arc<Connection>>>,
    db: Db,
    dispatcher: Arc<Dispatcher>,
    counter: RwLock<u128>,
}

impl Connections {
    /// Returns a new, empty connection registry backed by `db`.
    pub fn new(db: Db) -> Self {
        Self {
            counter: RwLock::new(0),
            db,
            dispatcher: Arc::new(Dispatcher::new()),
            connections: RwLock::new(BTreeMap::new()),
        }
    }

    /// Returns the keyspace shared by every connection.
    pub fn db(&self) -> Db {
        self.db.clone()
    }

    /// Returns the dispatcher instance.
    pub fn get_dispatcher(&self) -> Arc<Dispatcher> {
        self.dispatcher.clone()
    }

    /// Removes a connection from the registry.
    pub fn remove(self: Arc<Connections>, conn: Arc<Connection>) {
        self.connections.write().remove(&conn.id());
    }

    /// Creates, registers and returns a new connection for a client at `addr`.
    pub fn new_connection(self: &Arc<Connections>, addr: SocketAddr) -> Arc<Connection> {
        let mut id = self.counter.write();
        *id += 1;

        let conn = Arc::new(Connection::new(*id, self.db.clone(), addr));
        self.connections.write().insert(*id, conn.clone());
        conn
    }

    /// Iterates over all connections currently registered.
    pub fn iter(&self, f: &mut dyn FnMut(Arc<Connection>)) {
        for value in self.connections.read().values() {
            f(value.clone())
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn new_connection_is_registered_and_removable() {
        let connections = Arc::new(Connections::new(Db::new(4)));
        let conn = connections.new_connection("127.0.0.1:6379".parse().unwrap());

        let mut seen = 0;
        connections.iter(&mut |_| seen += 1);
        assert_eq!(1, seen);

        connections.clone().remove(conn);
        seen = 0;
        connections.iter(&mut |_| seen += 1);
        assert_eq!(0, seen);
    }
}

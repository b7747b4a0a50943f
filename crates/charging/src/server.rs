use crate::{
    client::Client,
    collector::{self, Collector, CollectorRef},
    database::Database,
};

pub struct Server<D>
where
    D: Database,
{
    database: D,
}

impl<D> Server<D>
where
    D: Database,
{
    pub fn new(database: D) -> Self {
        Self { database }
    }

    /// A client whose log lines are tagged with `id`.
    pub fn client<S: Into<String>>(&self, id: S) -> Client<D> {
        Client::new(id, self.database.clone())
    }

    pub fn collector<C, F>(&self, factory: F) -> CollectorRef
    where
        C: Collector + Send + 'static,
        <C as Collector>::Error: Send,
        F: 'static + Send + Fn() -> C,
    {
        collector::run(factory, self.client(C::unique_id()))
    }
}

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc, OnceLock,
};

use ordo_di::{Bundle, Component, Dep, DependencyInfo, DescriptorBuilder, DynError, Injector, State};
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), DynError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "debug".into()))
        .init();

    let storage = Bundle::new("storage").with::<Database>().with::<Repository>();
    let injector = Injector::builder()
        .with_instance(String::from("postgres://localhost/demo"))
        .with_bundle(&storage)
        .can_inject::<Server>()
        .build()?;

    println!("{:?}", injector);
    for greeter in injector.all::<dyn Greeter>() {
        println!("{}", greeter.greet());
    }

    injector.stop()?;
    Ok(())
}

trait Greeter: Send + Sync {
    fn greet(&self) -> String;
}

struct Database {
    url: Arc<String>,
    connected: AtomicBool,
}
impl Component for Database {
    fn describe(d: DescriptorBuilder<Self>) -> DescriptorBuilder<Self> {
        d.constructor([DependencyInfo::of::<String>()], |mapper| {
            Ok(Database {
                url: mapper.get::<String>()?,
                connected: AtomicBool::new(false),
            })
        })
        .hook("connect", State::Initialized, [], |this, _| {
            tracing::info!("Connecting to {}", this.url);
            this.connected.store(true, Ordering::SeqCst);
            Ok(())
        })
        .hook("disconnect", State::Stopped, [], |this, _| {
            this.connected.store(false, Ordering::SeqCst);
            Ok(())
        })
    }
}

struct Repository {
    db: Arc<Database>,
}
impl Component for Repository {
    fn describe(d: DescriptorBuilder<Self>) -> DescriptorBuilder<Self> {
        d.constructor([DependencyInfo::component::<Database>()], |mapper| {
            Ok(Repository {
                db: mapper.get::<Database>()?,
            })
        })
        .provides::<dyn Greeter>(|this| this)
    }
}
impl Greeter for Repository {
    fn greet(&self) -> String {
        format!(
            "Repository on {} (connected: {})",
            self.db.url,
            self.db.connected.load(Ordering::SeqCst)
        )
    }
}

#[derive(Default)]
struct Server {
    repository: OnceLock<Arc<Repository>>,
}
impl Component for Server {
    fn describe(d: DescriptorBuilder<Self>) -> DescriptorBuilder<Self> {
        d.default_constructor()
            .inject(Dep::<Repository>::component(), |this, repository| {
                let _ = this.repository.set(repository);
            })
            .hook(
                "listen",
                State::Started,
                [DependencyInfo::component::<Database>().at(State::Initialized)],
                |_, _| {
                    tracing::info!("Server listening");
                    Ok(())
                },
            )
            .provides::<dyn Greeter>(|this| this)
    }
}
impl Greeter for Server {
    fn greet(&self) -> String {
        match self.repository.get() {
            Some(_) => "Server with repository".to_string(),
            None => "Server without repository".to_string(),
        }
    }
}

//! Build scenarios: chains, diamonds, cycles and missing dependencies.

mod test_utils;

use std::sync::Arc;

use ordo_di::{
    Component, Dep, DependencyInfo, DescriptorBuilder, GraphError, InitError, Injector, State,
    TypeInfo,
};
use test_utils::{construct, log_dependency, EventLog};

mod chain {
    use super::*;

    pub struct A {
        pub log: Arc<EventLog>,
    }
    pub struct B {
        pub log: Arc<EventLog>,
    }
    pub struct C {
        pub log: Arc<EventLog>,
    }

    impl Component for A {
        fn describe(d: DescriptorBuilder<Self>) -> DescriptorBuilder<Self> {
            d.constructor([log_dependency()], |m| Ok(A { log: construct(m, "A")? }))
                .hook(
                    "resolve",
                    State::Resolved,
                    [DependencyInfo::component::<B>().at(State::Resolved)],
                    |this, m| {
                        this.log.push(format!("hook A, B is {:?}", m.state_of::<B>()));
                        Ok(())
                    },
                )
        }
    }

    impl Component for B {
        fn describe(d: DescriptorBuilder<Self>) -> DescriptorBuilder<Self> {
            d.constructor([log_dependency()], |m| Ok(B { log: construct(m, "B")? }))
                .hook(
                    "resolve",
                    State::Resolved,
                    [DependencyInfo::component::<C>().at(State::Resolved)],
                    |this, m| {
                        this.log.push(format!("hook B, C is {:?}", m.state_of::<C>()));
                        Ok(())
                    },
                )
        }
    }

    impl Component for C {
        fn describe(d: DescriptorBuilder<Self>) -> DescriptorBuilder<Self> {
            d.constructor([log_dependency()], |m| Ok(C { log: construct(m, "C")? }))
                .hook("resolve", State::Resolved, [], |this, _| {
                    this.log.push("hook C");
                    Ok(())
                })
        }
    }
}

mod diamond {
    use super::*;

    macro_rules! node {
        ($name:ident, [$($dep:ident),*]) => {
            pub struct $name;
            impl Component for $name {
                fn describe(d: DescriptorBuilder<Self>) -> DescriptorBuilder<Self> {
                    d.constructor(
                        [log_dependency() $(, DependencyInfo::component::<$dep>())*],
                        |m| {
                            construct(m, stringify!($name))?;
                            Ok($name)
                        },
                    )
                }
            }
        };
    }

    node!(A, [B, C]);
    node!(B, [D]);
    node!(C, [D]);
    node!(D, []);
    node!(Top, [C, B]);
}

mod cycle {
    use super::*;

    #[derive(Default)]
    pub struct A;
    #[derive(Default)]
    pub struct B;

    impl Component for A {
        fn describe(d: DescriptorBuilder<Self>) -> DescriptorBuilder<Self> {
            d.constructor([log_dependency()], |m| {
                construct(m, "A")?;
                Ok(A)
            })
            .inject(Dep::<B>::component().at(State::Initialized), |_, _| {})
        }
    }

    impl Component for B {
        fn describe(d: DescriptorBuilder<Self>) -> DescriptorBuilder<Self> {
            d.constructor([log_dependency()], |m| {
                construct(m, "B")?;
                Ok(B)
            })
            .inject(Dep::<A>::component().at(State::Initialized), |_, _| {})
        }
    }
}

mod missing {
    use super::*;

    /// Never registered, and not a component
    pub struct X;

    pub struct A;
    impl Component for A {
        fn describe(d: DescriptorBuilder<Self>) -> DescriptorBuilder<Self> {
            d.constructor([log_dependency(), DependencyInfo::of::<X>()], |m| {
                construct(m, "A")?;
                Ok(A)
            })
        }
    }
}

#[test]
fn linear_chain_resolves_dependencies_first() {
    let log = EventLog::default();
    let injector = Injector::builder()
        .with_instance(log.clone())
        .can_inject::<chain::A>()
        .build()
        .unwrap();

    assert_eq!(
        log.events(),
        vec![
            "construct C",
            "construct B",
            "construct A",
            "hook C",
            "hook B, C is Some(Resolved)",
            "hook A, B is Some(Resolved)",
        ]
    );
    assert_eq!(injector.state_of::<chain::A>(), Some(State::Started));
    assert_eq!(injector.state_of::<chain::C>(), Some(State::Started));
}

#[test]
fn diamond_constructs_shared_dependency_once_and_first() {
    let log = EventLog::default();
    Injector::builder()
        .with_instance(log.clone())
        .can_inject::<diamond::A>()
        .build()
        .unwrap();

    assert_eq!(
        log.events(),
        vec!["construct D", "construct B", "construct C", "construct A"]
    );
}

#[test]
fn cycle_is_reported_with_its_chain() {
    let log = EventLog::default();
    let result = Injector::builder()
        .with_instance(log.clone())
        .can_inject::<cycle::A>()
        .build();

    let chain = match result {
        Err(InitError::Graph(GraphError::CyclicReference { chain })) => chain,
        other => panic!("expected a cyclic reference, got {:?}", other),
    };
    assert_eq!(
        chain,
        vec![
            TypeInfo::of::<cycle::A>(),
            TypeInfo::of::<cycle::B>(),
            TypeInfo::of::<cycle::A>()
        ]
    );

    let message = InitError::Graph(GraphError::CyclicReference { chain }).to_string();
    assert!(message.contains("cycle::A"));
    assert!(message.contains("cycle::B"));
    assert!(log.events().is_empty());
}

#[test]
fn missing_dependency_aborts_before_construction() {
    let log = EventLog::default();
    let result = Injector::builder()
        .with_instance(log.clone())
        .can_inject::<missing::A>()
        .build();

    match result {
        Err(InitError::Graph(GraphError::NotFound {
            dependency,
            required_by,
        })) => {
            assert_eq!(dependency, TypeInfo::of::<missing::X>());
            assert_eq!(required_by, Some(TypeInfo::of::<missing::A>()));
        }
        other => panic!("expected NotFound, got {:?}", other),
    }
    assert!(log.events().is_empty());
}

#[test]
fn registration_order_breaks_ties() {
    let log = EventLog::default();
    Injector::builder()
        .with_instance(log.clone())
        .can_inject::<diamond::C>()
        .can_inject::<diamond::B>()
        .build()
        .unwrap();

    assert_eq!(
        log.events(),
        vec!["construct D", "construct C", "construct B"]
    );
}

#[test]
fn registration_order_beats_declaration_order() {
    let log = EventLog::default();
    Injector::builder()
        .with_instance(log.clone())
        .can_inject::<diamond::Top>()
        .can_inject::<diamond::B>()
        .can_inject::<diamond::C>()
        .can_inject::<diamond::D>()
        .build()
        .unwrap();

    assert_eq!(
        log.events(),
        vec!["construct D", "construct B", "construct C", "construct Top"]
    );
}

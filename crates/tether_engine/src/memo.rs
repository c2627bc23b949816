//! Named, parameterized intents with stable identity.
//!
//! A read function that builds its activation from arguments produces a fresh
//! closure on every evaluation. [`ParameterizedIntent`] memoizes the built
//! intent per argument tuple, so repeated evaluations with the same arguments
//! get back the very same [`Intent`] object and deduplicate.
//!
//! Arguments are keyed structurally through [`ArgKey`], so `("a,b",)` and
//! `("a", "b")` never collide.
//!
//! The builder takes the owned form of the arguments (`String` for strings),
//! while [`ParameterizedIntent::get`] accepts any tuple with the same owned
//! form, so strings borrowed from state can be passed directly. Arguments are
//! only converted to their owned form when the intent is first built.
//!
//! The cache grows with the number of distinct argument tuples ever seen and is
//! never evicted.
//!
//! # Example
//!
//! ```
//! use tether_engine::cleanup::Cleanup;
//! use tether_engine::intent::Intent;
//! use tether_engine::memo::define_parameterized_intent;
//!
//! let issues = define_parameterized_intent(
//!     "Issues",
//!     |(org, repo, page): (String, String, u32)| {
//!         let topic = format!("{org}/{repo}?page={page}");
//!         move |_ctx: &()| {
//!             let topic = topic.clone();
//!             Cleanup::new(move || drop(topic))
//!         }
//!     },
//! );
//!
//! let org = String::from("org1");
//! let a = issues.get((org.as_str(), "repo1", 2_u32));
//! let b = issues.get(("org1", "repo1", 2_u32));
//! assert!(Intent::ptr_eq(&a, &b));
//! assert_eq!(a.to_string(), "Issues(org1,repo1,2)");
//! ```

use crate::cleanup::Cleanup;
use crate::intent::{Intent, ResourceType};
use core::fmt;
use hashbrown::HashMap;
use std::cell::RefCell;
use std::rc::Rc;
use variadics_please::all_tuples;

/// One primitive argument of a parameterized intent.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ArgValue {
    /// A string argument.
    Str(String),
    /// A signed integer argument.
    Int(i64),
    /// An unsigned integer argument.
    UInt(u64),
    /// A boolean argument.
    Bool(bool),
    /// A character argument.
    Char(char),
}

impl fmt::Display for ArgValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Str(value) => f.write_str(value),
            Self::Int(value) => write!(f, "{value}"),
            Self::UInt(value) => write!(f, "{value}"),
            Self::Bool(value) => write!(f, "{value}"),
            Self::Char(value) => write!(f, "{value}"),
        }
    }
}

/// Structural cache key for an argument tuple.
///
/// Compared element by element, never through a joined string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct ArgKey(Vec<ArgValue>);

impl ArgKey {
    /// Returns the individual argument values.
    #[must_use]
    pub fn values(&self) -> &[ArgValue] {
        &self.0
    }
}

impl fmt::Display for ArgKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, value) in self.0.iter().enumerate() {
            if index > 0 {
                f.write_str(",")?;
            }
            write!(f, "{value}")?;
        }
        Ok(())
    }
}

/// A primitive value usable as a parameterized intent argument.
///
/// A value and its owned form produce equal [`ArgValue`]s.
pub trait IntentArg {
    /// The owned form handed to builders.
    type Owned: IntentArg<Owned = Self::Owned> + 'static;

    /// Converts this value to its structural form.
    fn to_arg(&self) -> ArgValue;

    /// Converts this value to its owned form.
    fn to_owned_arg(&self) -> Self::Owned;
}

impl IntentArg for str {
    type Owned = String;

    fn to_arg(&self) -> ArgValue {
        ArgValue::Str(self.to_string())
    }

    fn to_owned_arg(&self) -> String {
        self.to_string()
    }
}

impl IntentArg for String {
    type Owned = String;

    fn to_arg(&self) -> ArgValue {
        ArgValue::Str(self.clone())
    }

    fn to_owned_arg(&self) -> String {
        self.clone()
    }
}

impl<T: IntentArg + ?Sized> IntentArg for &T {
    type Owned = T::Owned;

    fn to_arg(&self) -> ArgValue {
        (**self).to_arg()
    }

    fn to_owned_arg(&self) -> T::Owned {
        (**self).to_owned_arg()
    }
}

macro_rules! impl_intent_arg_copy {
    ($variant:ident: $($ty:ty),*) => {
        $(
            impl IntentArg for $ty {
                type Owned = $ty;

                fn to_arg(&self) -> ArgValue {
                    ArgValue::$variant(*self)
                }

                fn to_owned_arg(&self) -> $ty {
                    *self
                }
            }
        )*
    };
}

macro_rules! impl_intent_arg_int {
    ($variant:ident => $wide:ty: $($ty:ty),*) => {
        $(
            impl IntentArg for $ty {
                type Owned = $ty;

                fn to_arg(&self) -> ArgValue {
                    ArgValue::$variant(<$wide>::from(*self))
                }

                fn to_owned_arg(&self) -> $ty {
                    *self
                }
            }
        )*
    };
}

impl_intent_arg_copy!(Bool: bool);
impl_intent_arg_copy!(Char: char);
impl_intent_arg_int!(Int => i64: i8, i16, i32, i64);
impl_intent_arg_int!(UInt => u64: u8, u16, u32, u64);

impl IntentArg for usize {
    type Owned = usize;

    fn to_arg(&self) -> ArgValue {
        ArgValue::UInt(*self as u64)
    }

    fn to_owned_arg(&self) -> usize {
        *self
    }
}

impl IntentArg for isize {
    type Owned = isize;

    fn to_arg(&self) -> ArgValue {
        ArgValue::Int(*self as i64)
    }

    fn to_owned_arg(&self) -> isize {
        *self
    }
}

/// An argument tuple of a parameterized intent.
///
/// Implemented for `()` and for tuples of up to eight [`IntentArg`] values.
/// The owned tuple of `(&str, u32)` is `(String, u32)`.
pub trait IntentArgs {
    /// The owned tuple handed to builders.
    type Owned: IntentArgs<Owned = Self::Owned> + 'static;

    /// Returns the structural cache key for these arguments.
    fn to_key(&self) -> ArgKey;

    /// Converts every argument to its owned form.
    fn to_owned_args(&self) -> Self::Owned;
}

impl IntentArgs for () {
    type Owned = ();

    fn to_key(&self) -> ArgKey {
        ArgKey::default()
    }

    fn to_owned_args(&self) {}
}

macro_rules! impl_intent_args_tuple {
    ($($arg:ident),*) => {
        impl<$($arg: IntentArg),*> IntentArgs for ($($arg,)*) {
            type Owned = ($($arg::Owned,)*);

            fn to_key(&self) -> ArgKey {
                #[expect(non_snake_case, reason = "bindings reuse the tuple's type parameter names")]
                let ($($arg,)*) = self;
                ArgKey(vec![$($arg.to_arg()),*])
            }

            fn to_owned_args(&self) -> Self::Owned {
                #[expect(non_snake_case, reason = "bindings reuse the tuple's type parameter names")]
                let ($($arg,)*) = self;
                ($($arg.to_owned_arg(),)*)
            }
        }
    };
}

// Generate impls for tuples of size 1 to 8
all_tuples!(impl_intent_args_tuple, 1, 8, A);

type Builder<C, A> = dyn Fn(A) -> Box<dyn Fn(&C) -> Cleanup>;

struct ParameterizedInner<C, A> {
    name: String,
    builder: Box<Builder<C, A>>,
    cache: RefCell<HashMap<ArgKey, Intent<C>>>,
}

/// A memoizing factory of named intents, one per distinct argument tuple.
///
/// Created with [`define_parameterized_intent`]. Each argument tuple gets its
/// own [`ResourceType`] named `name(args)`, built once by the user's builder,
/// and an unkeyed intent of that type. Cloning the factory shares the cache.
pub struct ParameterizedIntent<C, A> {
    inner: Rc<ParameterizedInner<C, A>>,
}

impl<C, A> Clone for ParameterizedIntent<C, A> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<C, A> fmt::Debug for ParameterizedIntent<C, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParameterizedIntent")
            .field("name", &self.inner.name)
            .field("cached", &self.inner.cache.borrow().len())
            .finish()
    }
}

/// Defines a parameterized intent.
///
/// `builder` receives the owned argument tuple and returns the activation for
/// that tuple. It runs once per distinct tuple; later calls with equal
/// arguments return the cached intent. Builders taking borrowed arguments such
/// as `(&str, u32)` are rejected; take `(String, u32)` and pass `(&str, u32)`
/// to [`ParameterizedIntent::get`] instead.
#[must_use]
pub fn define_parameterized_intent<C, A, B, F>(
    name: impl Into<String>,
    builder: B,
) -> ParameterizedIntent<C, A>
where
    C: 'static,
    A: IntentArgs<Owned = A> + 'static,
    B: Fn(A) -> F + 'static,
    F: Fn(&C) -> Cleanup + 'static,
{
    ParameterizedIntent {
        inner: Rc::new(ParameterizedInner {
            name: name.into(),
            builder: Box::new(move |args: A| -> Box<dyn Fn(&C) -> Cleanup> {
                Box::new(builder(args))
            }),
            cache: RefCell::new(HashMap::new()),
        }),
    }
}

impl<C: 'static, A: IntentArgs<Owned = A>> ParameterizedIntent<C, A> {
    /// Returns the intent for `args`, building it on first use.
    ///
    /// `args` may borrow: `(&str, u32)` looks up the intent of a
    /// `(String, u32)` factory without allocating owned strings on a hit.
    pub fn get<Q>(&self, args: Q) -> Intent<C>
    where
        Q: IntentArgs<Owned = A>,
    {
        let key = args.to_key();
        if let Some(intent) = self.inner.cache.borrow().get(&key) {
            return intent.clone();
        }

        // Build outside the borrow so a builder may consult this factory.
        let activation = (self.inner.builder)(args.to_owned_args());
        let ty = ResourceType::new(format!("{}({key})", self.inner.name), move |_key, ctx| {
            activation(ctx)
        });
        tracing::trace!(resource = %ty.name(), "built parameterized intent");

        self.inner
            .cache
            .borrow_mut()
            .entry(key)
            .or_insert_with(|| ty.intent(""))
            .clone()
    }
}

impl<C, A> ParameterizedIntent<C, A> {
    /// Returns the base name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Returns the number of cached argument tuples.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.cache.borrow().len()
    }

    /// Returns `true` if no intent has been built yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.cache.borrow().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn same_arguments_return_same_intent() {
        let builds = Rc::new(Cell::new(0));
        let counter = Rc::clone(&builds);
        let issues = define_parameterized_intent("Issues", move |args: (String, String, i32)| {
            counter.set(counter.get() + 1);
            let _ = args;
            |_: &()| Cleanup::new(|| ())
        });

        let a = issues.get(("org1", "repo1", 2_i32));
        let b = issues.get(("org1", "repo1", 2_i32));
        assert!(Intent::ptr_eq(&a, &b));
        assert_eq!(a, b);
        assert_eq!(builds.get(), 1);
        assert_eq!(issues.len(), 1);

        let c = issues.get(("org1", "repo1", 3_i32));
        assert_ne!(a, c);
        assert_eq!(builds.get(), 2);
    }

    #[test]
    fn delimiters_in_arguments_do_not_collide() {
        let pair = define_parameterized_intent("Pair", |_: (String, String)| |_: &()| Cleanup::None);
        let single = define_parameterized_intent("Pair", |_: (String,)| |_: &()| Cleanup::None);

        let joined = pair.get(("a,b", "c"));
        let split = pair.get(("a", "b,c"));
        assert_ne!(joined, split);
        assert_eq!(pair.len(), 2);

        assert_ne!(single.get(("a,b",)), joined);
    }

    #[test]
    fn typed_arguments_are_distinct() {
        let ints = define_parameterized_intent("Page", |_: (i64,)| |_: &()| Cleanup::None);
        let strs = define_parameterized_intent("Page", |_: (String,)| |_: &()| Cleanup::None);
        assert_ne!(ints.get((1_i64,)).id(), strs.get(("1",)).id());
        assert_ne!((1_i64,).to_key(), ("1",).to_key());
    }

    #[test]
    fn display_name_tags_arguments() {
        let watch = define_parameterized_intent("Watch", |_: (String, u32, bool)| {
            |_: &()| Cleanup::None
        });
        let intent = watch.get(("main", 7_u32, true));
        assert_eq!(intent.resource_type().name(), "Watch(main,7,true)");
        assert_eq!(intent.key(), "");
    }

    #[test]
    fn built_activation_runs_with_context() {
        let seen = Rc::new(Cell::new(0));
        let sink = Rc::clone(&seen);
        let counter = define_parameterized_intent("Counter", move |(step,): (u32,)| {
            let sink = Rc::clone(&sink);
            move |base: &u32| {
                sink.set(base + step);
                Cleanup::None
            }
        });

        let intent = counter.get((5_u32,));
        let cleanup = intent.resource_type().activate(intent.key(), &10).unwrap();
        assert!(cleanup.is_none());
        assert_eq!(seen.get(), 15);
    }

    #[test]
    fn borrowed_and_owned_arguments_share_one_intent() {
        let builds = Rc::new(Cell::new(0));
        let counter = Rc::clone(&builds);
        let repo = define_parameterized_intent("Repo", move |(org, name): (String, String)| {
            counter.set(counter.get() + 1);
            assert_eq!(format!("{org}/{name}"), "acme/widgets");
            |_: &()| Cleanup::None
        });

        let state = vec![String::from("acme"), String::from("widgets")];
        let borrowed = repo.get((state[0].as_str(), &state[1]));
        let owned = repo.get(("acme".to_string(), "widgets".to_string()));
        assert!(Intent::ptr_eq(&borrowed, &owned));
        assert_eq!(builds.get(), 1);
    }

    #[test]
    fn unit_arguments_share_one_intent() {
        let ping = define_parameterized_intent("Ping", |(): ()| |_: &()| Cleanup::None);
        assert!(Intent::ptr_eq(&ping.get(()), &ping.get(())));
        assert_eq!(ping.get(()).to_string(), "Ping()");
    }
}

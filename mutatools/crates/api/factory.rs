//! Mutator factories and the chain composing them.

use std::rc::Rc;

use thiserror::Error;

use crate::api::Mutator;
use crate::mutators::delayed::DelayedMutator;
use crate::mutators::standard_factories;
use crate::support::typeref::{TypeKind, TypePath, TypeRef};

/// Errors raised while assembling a mutator tree. These are fail-fast: the driver surfaces
/// them to the user verbatim, there is no retry.
#[derive(Error, Debug)]
pub enum BuildError {
    #[error("no factory can build a mutator at {path}")]
    Unsupported { path: String },
    #[error("invalid type at {path}: {message}")]
    Invalid { path: String, message: String },
    #[error("unknown message `{name}` at {path}")]
    UnknownMessage { path: String, name: String },
    #[error("recursive reference `{name}` at {path} does not match any enclosing type")]
    UnknownRecursion { path: String, name: String },
    #[error("recursion placeholder for `{name}` at {path} was resolved twice")]
    ResolvedTwice { path: String, name: String },
}

pub type BuildResult<T> = Result<T, BuildError>;

/// A partial mutator constructor. Returns `None` when the type is not its business, so the
/// chain can try the next factory; returns `Some(Err(..))` when the type is its business but
/// malformed.
pub trait MutatorFactory {
    fn try_create(
        &self,
        ty: &TypeRef,
        chain: &FactoryChain,
        ctx: &mut BuildContext,
    ) -> Option<BuildResult<Rc<dyn Mutator>>>;
}

/// Per-build state: the dotted path for error messages and the stack of named types currently
/// under construction, used to break recursion with `delayed` placeholders.
pub struct BuildContext {
    path: TypePath,
    frames: Vec<Frame>,
}

struct Frame {
    name: String,
    placeholders: Vec<Rc<DelayedMutator>>,
}

impl BuildContext {
    fn new() -> Self {
        Self { path: TypePath::root("Root"), frames: Vec::new() }
    }

    pub fn path(&self) -> &TypePath {
        &self.path
    }

    fn has_frame(&self, name: &str) -> bool {
        self.frames.iter().any(|frame| frame.name == name)
    }
}

/// Priority-ordered list of partial factories; the first one that answers wins. Factories
/// recurse into the chain to build their children.
pub struct FactoryChain {
    factories: Vec<Box<dyn MutatorFactory>>,
}

impl FactoryChain {
    pub fn new(factories: Vec<Box<dyn MutatorFactory>>) -> Self {
        Self { factories }
    }

    /// The built-in factories covering every `TypeKind`.
    pub fn standard() -> Self {
        Self::new(standard_factories())
    }

    /// Pushes a user factory in front of the chain. First match wins, so this is how built-in
    /// handling is overridden (typically keyed on a `Custom` annotation).
    pub fn prepend(&mut self, factory: Box<dyn MutatorFactory>) {
        self.factories.insert(0, factory);
    }

    /// Builds the root mutator for a fuzz run.
    pub fn build_root(&self, ty: &TypeRef) -> BuildResult<Rc<dyn Mutator>> {
        self.build(ty, &mut BuildContext::new())
    }

    /// Builds a child mutator under an extra path segment. Factories use this for their
    /// sub-mutators so errors name the offending child path.
    pub fn build_child(
        &self,
        ty: &TypeRef,
        ctx: &mut BuildContext,
        segment: impl Into<String>,
    ) -> BuildResult<Rc<dyn Mutator>> {
        ctx.path.push(segment);
        let result = self.build(ty, ctx);
        ctx.path.pop();
        result
    }

    /// Builds a mutator for `ty`, breaking recursion into enclosing named types with
    /// `delayed` placeholders that are patched once the enclosing mutator exists.
    pub fn build(&self, ty: &TypeRef, ctx: &mut BuildContext) -> BuildResult<Rc<dyn Mutator>> {
        match &ty.kind {
            TypeKind::Recurse(name) => {
                if !ctx.has_frame(name) {
                    return Err(BuildError::UnknownRecursion {
                        path: ctx.path.render(),
                        name: name.clone(),
                    });
                }
                return Ok(self.placeholder(name, ctx));
            }
            TypeKind::Record { name, .. } | TypeKind::Variant { name, .. }
                if ctx.has_frame(name) =>
            {
                return Ok(self.placeholder(name, ctx));
            }
            _ => {}
        }

        let frame_name = match &ty.kind {
            TypeKind::Record { name, .. } | TypeKind::Variant { name, .. } => Some(name.clone()),
            _ => None,
        };
        if let Some(name) = &frame_name {
            ctx.frames.push(Frame { name: name.clone(), placeholders: Vec::new() });
        }

        let result = self.dispatch(ty, ctx);

        if let Some(name) = frame_name {
            let frame = ctx.frames.pop().expect("construction stack underflow");
            if let Ok(built) = &result {
                for placeholder in &frame.placeholders {
                    if placeholder.resolve(Rc::downgrade(built)).is_err() {
                        return Err(BuildError::ResolvedTwice {
                            path: ctx.path.render(),
                            name: name.clone(),
                        });
                    }
                }
            }
        }
        result
    }

    fn dispatch(&self, ty: &TypeRef, ctx: &mut BuildContext) -> BuildResult<Rc<dyn Mutator>> {
        for factory in &self.factories {
            if let Some(result) = factory.try_create(ty, self, ctx) {
                return result;
            }
        }
        Err(BuildError::Unsupported { path: ctx.path.render() })
    }

    fn placeholder(&self, name: &str, ctx: &mut BuildContext) -> Rc<dyn Mutator> {
        let placeholder = Rc::new(DelayedMutator::unresolved(name));
        let frame = ctx
            .frames
            .iter_mut()
            .rev()
            .find(|frame| frame.name == name)
            .expect("placeholder without a matching frame");
        frame.placeholders.push(Rc::clone(&placeholder));
        placeholder
    }
}

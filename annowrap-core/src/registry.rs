use indexmap::IndexMap;

use crate::graph::{TypeCode, TypeSystem};
use crate::wrapper::{Wrapper, WrapperKind};

/// Builds an empty wrapper ready to be populated by `wrap`.
pub type Factory = fn() -> Box<dyn Wrapper>;

fn make<T: WrapperKind>() -> Box<dyn Wrapper> {
    Box::new(T::default())
}

/// Error type for registry construction and startup validation.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("type code {0} is registered twice")]
    Duplicate(TypeCode),
    #[error("type code {0} is registered but not declared by the type system")]
    Undeclared(TypeCode),
    #[error("factory for {key} builds wrappers of type {built}")]
    FactoryMismatch { key: TypeCode, built: TypeCode },
    #[error("no wrapper registered for type code {0}")]
    UnknownTypeCode(TypeCode),
}

/// Static mapping from type code to wrapper factory.
///
/// Built once at startup and validated against the graph's type system, so a
/// missing wrapper shows up as a configuration error instead of a failure in
/// the middle of a processing unit.
#[derive(Debug, Clone, Default)]
pub struct WrapperRegistry {
    factories: IndexMap<TypeCode, Factory>,
}

impl WrapperRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `T` under its type code.
    pub fn register<T: WrapperKind>(&mut self) -> Result<&mut Self, RegistryError> {
        if self.factories.contains_key(&T::TYPE_CODE) {
            return Err(RegistryError::Duplicate(T::TYPE_CODE));
        }
        self.factories.insert(T::TYPE_CODE, make::<T>);
        Ok(self)
    }

    /// Returns the factory registered for exactly this type code.
    pub fn factory(&self, ty: TypeCode) -> Option<Factory> {
        self.factories.get(&ty).copied()
    }

    /// Builds an empty wrapper for exactly this type code.
    pub fn create(&self, ty: TypeCode) -> Option<Box<dyn Wrapper>> {
        self.factory(ty).map(|factory| factory())
    }

    /// Finds the factory for `ty` or, failing that, its nearest registered ancestor.
    pub fn resolve(&self, types: &TypeSystem, ty: TypeCode) -> Option<(TypeCode, Factory)> {
        types
            .ancestry(ty)
            .find_map(|code| self.factory(code).map(|factory| (code, factory)))
    }

    pub fn contains(&self, ty: TypeCode) -> bool {
        self.factories.contains_key(&ty)
    }

    pub fn type_codes(&self) -> impl Iterator<Item = TypeCode> + '_ {
        self.factories.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }

    /// Checks every registration against the type system.
    pub fn validate(&self, types: &TypeSystem) -> Result<(), RegistryError> {
        for (code, factory) in &self.factories {
            if !types.contains(*code) {
                return Err(RegistryError::Undeclared(*code));
            }
            let built = factory().declared_type();
            if built != *code {
                return Err(RegistryError::FactoryMismatch { key: *code, built });
            }
        }
        Ok(())
    }

    /// Fails on the first type code that has no registered wrapper.
    pub fn require(&self, codes: &[TypeCode]) -> Result<(), RegistryError> {
        match codes.iter().find(|code| !self.contains(**code)) {
            Some(code) => Err(RegistryError::UnknownTypeCode(*code)),
            None => Ok(()),
        }
    }
}

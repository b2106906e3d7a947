use crate::expr::{self, Truth};
use crate::repository::{BuiltinValidator, Repository, TypeDef, ValidatorDef};
use crate::schema::{
    Constraint, ConstraintArgs, Expr, Field, Literal, TypeExpr, UserValidator, ValidatorBody,
    ValidatorRule,
};
use crate::scope::Scope;
use crate::validator::{ErrorCategory, ErrorCode, ValidationError};
use crate::value;
use regex::Regex;
use serde_json::{Map, Value};
use std::collections::{HashMap, HashSet};
use std::mem;

pub fn validate(
    max_depth: usize,
    repository: &Repository,
    instance: &Value,
    requested_root: Option<&str>,
) -> Vec<ValidationError> {
    let root_name = match resolve_root(repository, requested_root) {
        Ok(name) => name,
        Err(error) => return vec![error],
    };

    let mut vm = Vm {
        max_depth,
        repository,
        type_stack: HashMap::new(),
        errors: vec![],
    };

    let root_expr = TypeExpr::Named {
        name: root_name,
        constraints: vec![],
    };
    let scope = Scope::new(instance);
    vm.eval_type(&root_expr, instance, &scope, "$");
    vm.errors
}

fn resolve_root(
    repository: &Repository,
    requested: Option<&str>,
) -> Result<String, ValidationError> {
    if let Some(name) = requested {
        if repository.contains_type(name) {
            return Ok(name.to_owned());
        }
        return Err(ValidationError::new(
            "$",
            format!("Requested root type \"{}\" is not defined.", name),
            ErrorCode::UnknownType,
            ErrorCategory::TypeError,
        ));
    }

    if repository.contains_type("Root") {
        return Ok("Root".to_owned());
    }

    let names = repository.user_type_names();
    if names.len() == 1 {
        return Ok(names[0].to_owned());
    }

    Err(ValidationError::new(
        "$",
        format!(
            "Unable to infer root type: define a type named \"Root\", request one explicitly, \
             or define exactly one type. Available types: {}",
            names.join(", "),
        ),
        ErrorCode::UnknownType,
        ErrorCategory::TypeError,
    ))
}

struct Vm<'a> {
    max_depth: usize,
    repository: &'a Repository,
    type_stack: HashMap<String, usize>,
    errors: Vec<ValidationError>,
}

impl<'a> Vm<'a> {
    // Every eval method appends violations and returns whether the value was
    // locally acceptable. A failure must not stop sibling validation, except
    // where descending has no meaning (wrong shape, unresolvable type).
    fn eval_type<'v>(
        &mut self,
        expr: &TypeExpr,
        instance: &'v Value,
        scope: &Scope<'v>,
        path: &str,
    ) -> bool {
        match expr {
            TypeExpr::Absent => {
                self.push(
                    path,
                    "Value must be absent.",
                    ErrorCode::FieldMustBeAbsent,
                    ErrorCategory::ValidationError,
                );
                false
            }
            TypeExpr::Literal(ref literal) => {
                if literal_matches(literal, instance) {
                    true
                } else {
                    self.push(
                        path,
                        format!(
                            "Expected literal {}.",
                            value::display(&expr::literal_value(literal)),
                        ),
                        ErrorCode::TypeMismatch,
                        ErrorCategory::ValidationError,
                    );
                    false
                }
            }
            TypeExpr::Named {
                ref name,
                ref constraints,
            } => self.eval_named(name, constraints, instance, scope, path),
            TypeExpr::NullableNamed(ref name) => {
                instance.is_null() || self.eval_named(name, &[], instance, scope, path)
            }
            TypeExpr::Nullable(ref inner) => {
                instance.is_null() || self.eval_type(inner, instance, scope, path)
            }
            TypeExpr::Array {
                ref item,
                ref constraints,
            } => self.eval_array(item, constraints, instance, scope, path),
            TypeExpr::Record { ref fields } => self.eval_record(fields, instance, scope, path),
            TypeExpr::Dict { ref key, ref value } => {
                self.eval_dict(key, value, instance, scope, path)
            }
            TypeExpr::Union(ref items) => self.eval_union(items, instance, scope, path),
            TypeExpr::Intersection(ref items) => {
                let mut ok = true;
                for item in items {
                    let branch = self.eval_type(item, instance, scope, path);
                    ok = branch && ok;
                }
                ok
            }
            TypeExpr::Conditional {
                ref condition,
                ref then,
                ref otherwise,
            } => self.eval_conditional(condition, then, otherwise, instance, scope, path),
        }
    }

    fn eval_named<'v>(
        &mut self,
        name: &str,
        constraints: &[Constraint],
        instance: &'v Value,
        scope: &Scope<'v>,
        path: &str,
    ) -> bool {
        let repository = self.repository;
        let matched = match repository.type_def(name) {
            None => {
                self.push(
                    path,
                    format!("Unknown type \"{}\".", name),
                    ErrorCode::UnknownType,
                    ErrorCategory::TypeError,
                );
                return false;
            }
            Some(TypeDef::Builtin(ref builtin)) => {
                let matched = builtin.matches(instance);
                if !matched {
                    self.push(
                        path,
                        format!("Expected type \"{}\".", name),
                        ErrorCode::TypeMismatch,
                        ErrorCategory::ValidationError,
                    );
                }
                matched
            }
            Some(TypeDef::User(ref user)) => {
                if self.enter(name) {
                    let matched = self.eval_type(&user.expr, instance, scope, path);
                    self.leave(name);
                    matched
                } else {
                    self.leave(name);
                    self.push(
                        path,
                        format!(
                            "Type recursion depth limit exceeded while resolving \"{}\".",
                            name,
                        ),
                        ErrorCode::InvalidExpression,
                        ErrorCategory::ValidationError,
                    );
                    return false;
                }
            }
        };

        // Constraints only apply once the base type accepted the value's
        // shape; a mismatched shape gets the type error alone.
        if matched {
            self.apply_constraints(name, constraints, instance, scope, path)
        } else {
            false
        }
    }

    fn eval_array<'v>(
        &mut self,
        item: &TypeExpr,
        constraints: &[Constraint],
        instance: &'v Value,
        scope: &Scope<'v>,
        path: &str,
    ) -> bool {
        let items = match value::items(instance) {
            Some(items) => items,
            None => {
                self.push(
                    path,
                    "Expected an array.",
                    ErrorCode::TypeMismatch,
                    ErrorCategory::ValidationError,
                );
                return false;
            }
        };

        let mut ok = true;
        for (index, element) in items.iter().enumerate() {
            let element_path = format!("{}[{}]", path, index);
            let element_ok = self.eval_type(item, element, &scope.child(element), &element_path);
            ok = element_ok && ok;
        }

        // List-level constraints see the whole list and the original scope.
        let constraints_ok = self.apply_constraints("Array", constraints, instance, scope, path);
        ok && constraints_ok
    }

    fn eval_record<'v>(
        &mut self,
        fields: &[Field],
        instance: &'v Value,
        scope: &Scope<'v>,
        path: &str,
    ) -> bool {
        let object = match value::entries(instance) {
            Some(object) => object,
            None => {
                self.push(
                    path,
                    "Expected an object.",
                    ErrorCode::TypeMismatch,
                    ErrorCategory::ValidationError,
                );
                return false;
            }
        };

        // One frame per record: `this` inside any field's constraint
        // arguments names the record, not the field value.
        let record_scope = scope.child(instance);

        let mut ok = true;
        for field in fields {
            let field_ok = self.eval_field(field, object, &record_scope, path);
            ok = field_ok && ok;
        }

        let declared: HashSet<&str> = fields.iter().map(|field| field.name.as_str()).collect();
        for key in object.keys() {
            if !declared.contains(key.as_str()) {
                self.push(
                    &format!("{}.{}", path, key),
                    format!("Unknown field \"{}\".", key),
                    ErrorCode::UnknownField,
                    ErrorCategory::SemanticError,
                );
                ok = false;
            }
        }
        ok
    }

    fn eval_field<'v>(
        &mut self,
        field: &Field,
        object: &'v Map<String, Value>,
        record_scope: &Scope<'v>,
        record_path: &str,
    ) -> bool {
        let field_path = format!("{}.{}", record_path, field.name);
        match object.get(&field.name) {
            None => {
                if field.optional
                    || field.default.is_some()
                    || self.admits_absence(&field.ty, record_scope)
                {
                    true
                } else {
                    self.push(
                        &field_path,
                        format!("Missing required field \"{}\".", field.name),
                        ErrorCode::FieldMissing,
                        ErrorCategory::ValidationError,
                    );
                    false
                }
            }
            Some(field_value) => {
                if let TypeExpr::Absent = field.ty {
                    self.push(
                        &field_path,
                        format!("Field \"{}\" must be absent.", field.name),
                        ErrorCode::FieldMustBeAbsent,
                        ErrorCategory::ValidationError,
                    );
                    return false;
                }
                self.eval_type(&field.ty, field_value, record_scope, &field_path)
            }
        }
    }

    fn eval_dict<'v>(
        &mut self,
        key_type: &TypeExpr,
        value_type: &TypeExpr,
        instance: &'v Value,
        scope: &Scope<'v>,
        path: &str,
    ) -> bool {
        let object = match value::entries(instance) {
            Some(object) => object,
            None => {
                self.push(
                    path,
                    "Expected an object for dictionary type.",
                    ErrorCode::TypeMismatch,
                    ErrorCategory::ValidationError,
                );
                return false;
            }
        };

        let mut ok = true;
        for (key, entry) in object {
            let key_value = Value::String(key.clone());
            let key_path = format!("{}.{{key:{}}}", path, key);
            let key_ok = self.eval_type(key_type, &key_value, &scope.child(&key_value), &key_path);
            ok = key_ok && ok;

            let entry_path = format!("{}.{}", path, key);
            let entry_ok = self.eval_type(value_type, entry, &scope.child(entry), &entry_path);
            ok = entry_ok && ok;
        }
        ok
    }

    fn eval_union<'v>(
        &mut self,
        items: &[TypeExpr],
        instance: &'v Value,
        scope: &Scope<'v>,
        path: &str,
    ) -> bool {
        for item in items {
            if self.eval_quiet(item, instance, scope, path) {
                return true;
            }
        }
        // Per-branch diagnostics are deliberately discarded; a failing union
        // reports one summary error.
        self.push(
            path,
            "Value does not match any union branch.",
            ErrorCode::InvalidExpression,
            ErrorCategory::ValidationError,
        );
        false
    }

    fn eval_conditional<'v>(
        &mut self,
        condition: &Expr,
        then: &TypeExpr,
        otherwise: &TypeExpr,
        instance: &'v Value,
        scope: &Scope<'v>,
        path: &str,
    ) -> bool {
        match expr::predicate(condition, scope) {
            Truth::True => self.eval_type(then, instance, scope, path),
            Truth::False => self.eval_type(otherwise, instance, scope, path),
            Truth::Undefined => {
                if self.eval_quiet(then, instance, scope, path) {
                    return true;
                }
                if self.eval_quiet(otherwise, instance, scope, path) {
                    return true;
                }
                self.push(
                    path,
                    "Value does not satisfy conditional type.",
                    ErrorCode::InvalidExpression,
                    ErrorCategory::ValidationError,
                );
                false
            }
        }
    }

    // Run an eval against a throwaway error buffer; success means no errors
    // were produced.
    fn eval_quiet<'v>(
        &mut self,
        expr: &TypeExpr,
        instance: &'v Value,
        scope: &Scope<'v>,
        path: &str,
    ) -> bool {
        let saved = mem::take(&mut self.errors);
        let ok = self.eval_type(expr, instance, scope, path);
        let buffered = mem::replace(&mut self.errors, saved);
        ok && buffered.is_empty()
    }

    // Structural check for whether a missing field is acceptable under this
    // type. Shares the per-type-name recursion bound with eval_type.
    fn admits_absence(&mut self, expr: &TypeExpr, scope: &Scope) -> bool {
        match expr {
            TypeExpr::Absent => true,
            TypeExpr::Union(ref items) => {
                items.iter().any(|item| self.admits_absence(item, scope))
            }
            TypeExpr::Intersection(ref items) => {
                items.iter().all(|item| self.admits_absence(item, scope))
            }
            TypeExpr::Conditional {
                ref condition,
                ref then,
                ref otherwise,
            } => match expr::predicate(condition, scope) {
                Truth::True => self.admits_absence(then, scope),
                Truth::False => self.admits_absence(otherwise, scope),
                Truth::Undefined => {
                    self.admits_absence(then, scope) || self.admits_absence(otherwise, scope)
                }
            },
            TypeExpr::Named { ref name, .. } => match self.repository.type_def(name) {
                Some(TypeDef::User(user)) => {
                    if self.enter(name) {
                        let admits = self.admits_absence(&user.expr, scope);
                        self.leave(name);
                        admits
                    } else {
                        self.leave(name);
                        false
                    }
                }
                _ => false,
            },
            _ => false,
        }
    }

    // ─── constraints ─────────────────────────────────────────────────────────

    // Constraints run in source order; one failing never suppresses the
    // rest.
    fn apply_constraints<'v>(
        &mut self,
        target: &str,
        constraints: &[Constraint],
        instance: &'v Value,
        scope: &Scope<'v>,
        path: &str,
    ) -> bool {
        let repository = self.repository;
        let mut ok = true;
        for constraint in constraints {
            let applied = match repository.validator(target, &constraint.name) {
                None => {
                    self.push(
                        path,
                        format!(
                            "Unknown constraint \"{}\" for type \"{}\".",
                            constraint.name, target,
                        ),
                        ErrorCode::UnknownConstraint,
                        ErrorCategory::SemanticError,
                    );
                    false
                }
                Some(ValidatorDef::Builtin(ref builtin)) => {
                    self.apply_builtin(builtin, constraint, instance, scope, path)
                }
                Some(ValidatorDef::User(ref user)) => {
                    self.apply_user(user, constraint, instance, scope, path)
                }
            };
            ok = applied && ok;
        }
        ok
    }

    fn apply_builtin(
        &mut self,
        builtin: &BuiltinValidator,
        constraint: &Constraint,
        instance: &Value,
        scope: &Scope,
        path: &str,
    ) -> bool {
        let argument = match self.builtin_argument(constraint, scope, path) {
            Ok(argument) => argument,
            Err(()) => return false,
        };

        if builtin.requires_argument() && argument.is_none() {
            self.push(
                path,
                format!("Constraint \"{}\" requires an argument.", constraint.name),
                ErrorCode::MissingArgument,
                ErrorCategory::ValidationError,
            );
            return false;
        }

        let result = match builtin.evaluate(instance, argument.as_ref()) {
            Some(result) => result,
            None => {
                self.push(
                    path,
                    format!(
                        "Constraint \"{}\" is not supported for current value.",
                        constraint.name,
                    ),
                    ErrorCode::ConstraintViolation,
                    ErrorCategory::ValidationError,
                );
                return false;
            }
        };

        let passed = if constraint.negated { !result } else { result };
        if !passed {
            let against = argument
                .as_ref()
                .map(value::display)
                .unwrap_or_else(|| "no argument".to_owned());
            self.push(
                path,
                format!(
                    "Constraint \"{}\" failed: expected {} against {}.",
                    constraint.name,
                    value::display(instance),
                    against,
                ),
                ErrorCode::ConstraintViolation,
                ErrorCategory::ValidationError,
            );
        }
        passed
    }

    // Built-ins take at most one argument: one unnamed positional in call
    // syntax, or the legacy single/list form.
    fn builtin_argument(
        &mut self,
        constraint: &Constraint,
        scope: &Scope,
        path: &str,
    ) -> Result<Option<Value>, ()> {
        match constraint.args {
            ConstraintArgs::None => Ok(None),
            ConstraintArgs::Call(ref args) => {
                if args.len() > 1 {
                    self.push(
                        path,
                        format!(
                            "Constraint \"{}\" accepts at most one argument.",
                            constraint.name,
                        ),
                        ErrorCode::TooManyArguments,
                        ErrorCategory::ValidationError,
                    );
                    return Err(());
                }
                match args.first() {
                    None => Ok(None),
                    Some(arg) => {
                        if arg.name.is_some() {
                            self.push(
                                path,
                                format!(
                                    "Constraint \"{}\" does not accept named arguments.",
                                    constraint.name,
                                ),
                                ErrorCode::UnknownArgumentName,
                                ErrorCategory::ValidationError,
                            );
                            return Err(());
                        }
                        self.eval_constraint_expr(&arg.value, scope, path, &constraint.name)
                            .map(Some)
                    }
                }
            }
            ConstraintArgs::Single(ref expr) => self
                .eval_constraint_expr(expr, scope, path, &constraint.name)
                .map(Some),
            ConstraintArgs::List(ref items) => {
                let mut evaluated = Vec::with_capacity(items.len());
                for item in items {
                    evaluated.push(self.eval_constraint_expr(item, scope, path, &constraint.name)?);
                }
                Ok(Some(Value::Array(evaluated)))
            }
        }
    }

    fn eval_constraint_expr(
        &mut self,
        expr: &Expr,
        scope: &Scope,
        path: &str,
        constraint_name: &str,
    ) -> Result<Value, ()> {
        match expr::eval(expr, scope) {
            Ok(value) => Ok(value),
            Err(failure) => {
                self.push(
                    path,
                    format!(
                        "Failed to evaluate argument for constraint \"{}\": {}.",
                        constraint_name, failure.message,
                    ),
                    failure.code,
                    ErrorCategory::TypeError,
                );
                Err(())
            }
        }
    }

    fn apply_user<'v>(
        &mut self,
        user: &UserValidator,
        constraint: &Constraint,
        instance: &'v Value,
        scope: &Scope<'v>,
        path: &str,
    ) -> bool {
        let bound = match self.bind_arguments(user, constraint, scope, path) {
            Some(bound) => bound,
            None => return false,
        };

        // The validator scope: `current` is the value under validation,
        // `parent` the enclosing value, and each argument is visible both
        // bare and `$`-prefixed.
        let mut variables = Vec::with_capacity(bound.len() * 2);
        for (name, argument) in bound {
            variables.push((format!("${}", name), argument.clone()));
            variables.push((name, argument));
        }
        let validator_scope = scope.child(instance).with_variables(variables);

        let result = eval_body(&user.body, instance, &validator_scope);
        let result = match result {
            Truth::Undefined => {
                self.push(
                    path,
                    format!(
                        "Validator \"{}({})\" cannot be evaluated by current runtime.",
                        user.target, user.name,
                    ),
                    ErrorCode::ValidatorFailed,
                    ErrorCategory::ValidationError,
                );
                return false;
            }
            Truth::True => true,
            Truth::False => false,
        };

        let passed = if constraint.negated { !result } else { result };
        if !passed {
            let message = match user.body {
                ValidatorBody::Detailed { ref message, .. } => message.clone(),
                _ => format!("Validator \"{}({})\" failed.", user.target, user.name),
            };
            self.push(path, message, ErrorCode::ValidatorFailed, ErrorCategory::ValidationError);
        }
        passed
    }

    // ─── argument binding ────────────────────────────────────────────────────

    // Binds constraint arguments to the validator's parameters, in
    // declaration order. Any failure appends exactly one error and yields
    // None.
    fn bind_arguments(
        &mut self,
        user: &UserValidator,
        constraint: &Constraint,
        scope: &Scope,
        path: &str,
    ) -> Option<Vec<(String, Value)>> {
        let params = &user.params;
        let mut bound: Vec<Option<Value>> = vec![None; params.len()];

        match constraint.args {
            ConstraintArgs::None => {}
            ConstraintArgs::Call(ref args) => {
                let mut seen_named = false;
                let mut positional = 0usize;
                for arg in args {
                    match arg.name {
                        None => {
                            if seen_named {
                                self.push(
                                    path,
                                    format!(
                                        "Positional arguments must precede named arguments \
                                         in call to \"{}\".",
                                        user.name,
                                    ),
                                    ErrorCode::UnknownArgumentName,
                                    ErrorCategory::ValidationError,
                                );
                                return None;
                            }
                            if positional >= params.len() {
                                self.push_too_many_arguments(user, path);
                                return None;
                            }
                            bound[positional] =
                                Some(self.eval_binder_expr(&arg.value, scope, path)?);
                            positional += 1;
                        }
                        Some(ref name) => {
                            seen_named = true;
                            let index = match params.iter().position(|param| param.name == *name) {
                                Some(index) => index,
                                None => {
                                    self.push(
                                        path,
                                        format!(
                                            "Unknown argument name \"{}\" for validator \
                                             \"{}({})\".",
                                            name, user.target, user.name,
                                        ),
                                        ErrorCode::UnknownArgumentName,
                                        ErrorCategory::ValidationError,
                                    );
                                    return None;
                                }
                            };
                            if bound[index].is_some() {
                                self.push(
                                    path,
                                    format!(
                                        "Argument \"{}\" bound more than once in call to \
                                         \"{}\".",
                                        name, user.name,
                                    ),
                                    ErrorCode::DuplicateArgument,
                                    ErrorCategory::ValidationError,
                                );
                                return None;
                            }
                            bound[index] = Some(self.eval_binder_expr(&arg.value, scope, path)?);
                        }
                    }
                }
            }
            ConstraintArgs::Single(ref expr) => {
                if params.is_empty() {
                    self.push_too_many_arguments(user, path);
                    return None;
                }
                bound[0] = Some(self.eval_binder_expr(expr, scope, path)?);
            }
            ConstraintArgs::List(ref items) => {
                if items.len() > params.len() {
                    self.push_too_many_arguments(user, path);
                    return None;
                }
                for (index, item) in items.iter().enumerate() {
                    bound[index] = Some(self.eval_binder_expr(item, scope, path)?);
                }
            }
        }

        let mut resolved: Vec<(String, Value)> = Vec::with_capacity(params.len());
        for (index, param) in params.iter().enumerate() {
            let argument = match bound[index].take() {
                Some(argument) => argument,
                None => match param.default {
                    Some(ref default) => {
                        // Defaults see the arguments bound so far, both bare
                        // and `$`-prefixed.
                        let mut visible = Vec::with_capacity(resolved.len() * 2);
                        for (name, argument) in &resolved {
                            visible.push((name.clone(), argument.clone()));
                            visible.push((format!("${}", name), argument.clone()));
                        }
                        let default_scope = scope.with_variables(visible);
                        match expr::eval(default, &default_scope) {
                            Ok(argument) => argument,
                            Err(failure) => {
                                self.push(
                                    path,
                                    format!(
                                        "Failed to evaluate default for argument \"{}\": {}.",
                                        param.name, failure.message,
                                    ),
                                    failure.code,
                                    ErrorCategory::TypeError,
                                );
                                return None;
                            }
                        }
                    }
                    None => {
                        self.push(
                            path,
                            format!(
                                "Missing required argument \"{}\" for validator \"{}({})\".",
                                param.name, user.target, user.name,
                            ),
                            ErrorCode::MissingArgument,
                            ErrorCategory::ValidationError,
                        );
                        return None;
                    }
                },
            };

            if let Some(ref hint) = param.type_hint {
                if !self.satisfies_hint(hint, &argument) {
                    self.push(
                        path,
                        format!(
                            "Argument \"{}\" does not satisfy type \"{}\".",
                            param.name, hint,
                        ),
                        ErrorCode::TypeMismatch,
                        ErrorCategory::TypeError,
                    );
                    return None;
                }
            }

            resolved.push((param.name.clone(), argument));
        }
        Some(resolved)
    }

    fn eval_binder_expr(&mut self, expr: &Expr, scope: &Scope, path: &str) -> Option<Value> {
        match expr::eval(expr, scope) {
            Ok(value) => Some(value),
            Err(failure) => {
                self.push(
                    path,
                    format!("Failed to evaluate argument: {}.", failure.message),
                    failure.code,
                    ErrorCategory::TypeError,
                );
                None
            }
        }
    }

    fn push_too_many_arguments(&mut self, user: &UserValidator, path: &str) {
        self.push(
            path,
            format!(
                "Too many arguments for validator \"{}({})\".",
                user.target, user.name,
            ),
            ErrorCode::TooManyArguments,
            ErrorCategory::ValidationError,
        );
    }

    // Type hints naming an unknown type are silently tolerated.
    fn satisfies_hint(&mut self, hint: &str, argument: &Value) -> bool {
        let repository = self.repository;
        match repository.type_def(hint) {
            None => true,
            Some(TypeDef::Builtin(ref builtin)) => builtin.matches(argument),
            Some(TypeDef::User(_)) => {
                let hint_expr = TypeExpr::Named {
                    name: hint.to_owned(),
                    constraints: vec![],
                };
                let hint_scope = Scope::new(argument);
                self.eval_quiet(&hint_expr, argument, &hint_scope, "$")
            }
        }
    }

    // ─── bookkeeping ─────────────────────────────────────────────────────────

    // Increments the per-name resolution depth; false means the bound was
    // exceeded. Built-in resolutions never touch the stack.
    fn enter(&mut self, name: &str) -> bool {
        let depth = self.type_stack.entry(name.to_owned()).or_insert(0);
        *depth += 1;
        *depth <= self.max_depth
    }

    fn leave(&mut self, name: &str) {
        if let Some(depth) = self.type_stack.get_mut(name) {
            *depth = depth.saturating_sub(1);
        }
    }

    fn push<M: Into<String>>(
        &mut self,
        path: &str,
        message: M,
        code: ErrorCode,
        category: ErrorCategory,
    ) {
        self.errors
            .push(ValidationError::new(path, message, code, category));
    }
}

fn eval_body(body: &ValidatorBody, instance: &Value, scope: &Scope) -> Truth {
    match body {
        ValidatorBody::Regex {
            ref pattern,
            negated,
        } => regex_rule(pattern, *negated, instance, scope),
        ValidatorBody::Predicate(ref predicate) => expr::predicate(predicate, scope),
        ValidatorBody::Detailed { ref rule, .. } => match rule {
            ValidatorRule::Regex {
                ref pattern,
                negated,
            } => regex_rule(pattern, *negated, instance, scope),
            ValidatorRule::Predicate(ref predicate) => expr::predicate(predicate, scope),
        },
    }
}

// A regex body only applies to strings; scope variables are substituted into
// the pattern before compiling. A pattern that fails to compile yields
// Undefined rather than an error.
fn regex_rule(pattern: &str, negated: bool, instance: &Value, scope: &Scope) -> Truth {
    let text = match instance.as_str() {
        Some(text) => text,
        None => return Truth::False,
    };
    let injected = expr::inject_variables(pattern, scope);
    match Regex::new(&injected) {
        Ok(regex) => {
            let matched = regex.is_match(text);
            Truth::from_bool(if negated { !matched } else { matched })
        }
        Err(_) => Truth::Undefined,
    }
}

fn literal_matches(literal: &Literal, instance: &Value) -> bool {
    match (literal, instance) {
        (Literal::Null, Value::Null) => true,
        (Literal::Bool(expected), Value::Bool(actual)) => expected == actual,
        (Literal::Int(expected), Value::Number(actual)) => {
            !actual.is_f64() && actual.as_i64() == Some(*expected)
        }
        (Literal::Duration(expected), Value::Number(actual)) => {
            !actual.is_f64() && actual.as_i64() == Some(*expected)
        }
        (Literal::Float(expected), Value::Number(actual)) => {
            actual.is_f64() && actual.as_f64() == Some(*expected)
        }
        (Literal::Str(expected), Value::String(actual)) => expected == actual,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn named(name: &str) -> TypeExpr {
        TypeExpr::Named {
            name: name.to_owned(),
            constraints: vec![],
        }
    }

    #[test]
    fn literal_equality_is_strict() {
        assert!(literal_matches(&Literal::Int(1), &json!(1)));
        assert!(!literal_matches(&Literal::Int(1), &json!(1.0)));
        assert!(!literal_matches(&Literal::Int(1), &json!("1")));
        assert!(literal_matches(&Literal::Str("a".to_owned()), &json!("a")));
        assert!(!literal_matches(&Literal::Bool(true), &json!(1)));
        assert!(literal_matches(&Literal::Null, &json!(null)));
    }

    #[test]
    fn union_failure_reports_one_summary() {
        let mut repository = Repository::with_builtins();
        repository
            .register_type(
                "Root",
                TypeExpr::Union(vec![named("Int"), named("Bool")]),
            )
            .unwrap();

        let errors = validate(64, &repository, &json!("neither"), None);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].path(), "$");
        assert_eq!(errors[0].message(), "Value does not match any union branch.");
    }

    #[test]
    fn absence_admission_unfolds_named_types() {
        let mut repository = Repository::with_builtins();
        repository
            .register_type("MaybeGone", TypeExpr::Union(vec![TypeExpr::Absent, named("Int")]))
            .unwrap();
        repository
            .register_type(
                "Root",
                TypeExpr::Record {
                    fields: vec![Field {
                        name: "trace".to_owned(),
                        ty: named("MaybeGone"),
                        optional: false,
                        default: None,
                    }],
                },
            )
            .unwrap();

        // Absent is fine (the union admits absence), present must be an Int.
        assert!(validate(64, &repository, &json!({}), None).is_empty());
        assert!(validate(64, &repository, &json!({"trace": 3}), None).is_empty());
        let errors = validate(64, &repository, &json!({"trace": "x"}), None);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].path(), "$.trace");
    }

    #[test]
    fn recursion_error_rebalances_the_stack() {
        let mut repository = Repository::with_builtins();
        repository.register_type("Loop", named("Loop")).unwrap();
        repository
            .register_type(
                "Root",
                TypeExpr::Record {
                    fields: vec![
                        Field {
                            name: "a".to_owned(),
                            ty: named("Loop"),
                            optional: false,
                            default: None,
                        },
                        Field {
                            name: "b".to_owned(),
                            ty: named("Int"),
                            optional: false,
                            default: None,
                        },
                    ],
                },
            )
            .unwrap();

        // The cycle fails locally; the sibling field is still validated.
        let errors = validate(64, &repository, &json!({"a": 1, "b": "nope"}), None);
        assert_eq!(errors.len(), 2);
        assert!(errors[0].message().contains("recursion depth"));
        assert_eq!(errors[1].path(), "$.b");
    }
}

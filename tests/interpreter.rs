#[cfg(test)]
mod interpreter_tests {
    use std::thread;

    use rox::interpreter::MAX_CALL_DEPTH;
    use rox::output::CaptureOutput;
    use rox::value::Value;
    use rox::Lox;

    /// Native stack for tests that recurse up to the call depth limit.
    const DEEP_STACK: usize = 64 * 1024 * 1024;

    /// Run `source` in a fresh session; return printed lines and every
    /// reported diagnostic.
    fn run(source: &str) -> (Vec<String>, Vec<String>) {
        let output = CaptureOutput::new();
        let mut lox = Lox::with_output(Box::new(output.clone()));

        lox.run(source);

        let errors: Vec<String> = lox
            .diagnostics_mut()
            .take_errors()
            .iter()
            .map(ToString::to_string)
            .collect();

        (output.lines(), errors)
    }

    /// Like [`run`], but each source runs in turn on one session hosted by a
    /// thread with a large stack.
    fn run_deep(sources: &'static [&'static str]) -> Vec<(Vec<String>, Vec<String>)> {
        thread::Builder::new()
            .stack_size(DEEP_STACK)
            .spawn(move || {
                let output = CaptureOutput::new();
                let mut lox = Lox::with_output(Box::new(output.clone()));

                sources
                    .iter()
                    .map(|source| {
                        output.clear();
                        lox.run(source);

                        let errors: Vec<String> = lox
                            .diagnostics_mut()
                            .take_errors()
                            .iter()
                            .map(ToString::to_string)
                            .collect();

                        (output.lines(), errors)
                    })
                    .collect()
            })
            .unwrap()
            .join()
            .unwrap()
    }

    fn run_ok(source: &str) -> Vec<String> {
        let (lines, errors) = run(source);
        assert!(errors.is_empty(), "unexpected errors: {:?}", errors);
        lines
    }

    // ───────────────────────── expressions ─────────────────────────

    #[test]
    fn test_arithmetic_precedence() {
        assert_eq!(run_ok("print 1 + 2 * 3; print (1 + 2) * 3;"), ["7", "9"]);
    }

    #[test]
    fn test_number_formatting() {
        assert_eq!(
            run_ok("print 10 / 4; print 3.0; print -0.5 * 2;"),
            ["2.5", "3", "-1"]
        );
    }

    #[test]
    fn test_large_and_non_finite_numbers() {
        let source = "print 1000000000 * 1000000000 * 1000; \
                      print 1000000000 * 1000000; \
                      print 123456789012345; \
                      var x = 1000000000; \
                      for (var i = 0; i < 6; i = i + 1) x = x * x; \
                      print x; print -x; print x - x;";

        assert_eq!(
            run_ok(source),
            [
                "1.0E21",
                "1.0E15",
                "123456789012345",
                "Infinity",
                "-Infinity",
                "NaN"
            ]
        );
    }

    #[test]
    fn test_string_concatenation() {
        assert_eq!(
            run_ok(r#"print "a" + "b"; print "count: " + 5; print 1 + "x"; print "t" + true;"#),
            ["ab", "count: 5", "1x", "ttrue"]
        );
    }

    #[test]
    fn test_minus_rejects_strings() {
        let (lines, errors) = run(r#"print 5 - "b";"#);

        assert!(lines.is_empty());
        assert_eq!(errors, ["Operands of '-' must be numbers.\n[line 1]"]);
    }

    #[test]
    fn test_plus_rejects_nil() {
        let (_, errors) = run("print nil + 1;");

        assert_eq!(
            errors,
            ["Operands of '+' must be two numbers or at least one string.\n[line 1]"]
        );
    }

    #[test]
    fn test_division_by_zero_halts_remaining_statements() {
        let (lines, errors) = run("print 1;\nprint 10 / 0;\nprint 2;");

        assert_eq!(lines, ["1"]);
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("Division by zero"));
        assert!(errors[0].ends_with("[line 2]"));
    }

    #[test]
    fn test_unary_operators() {
        assert_eq!(run_ok("print -(3); print !nil; print !0;"), ["-3", "true", "false"]);

        let (_, errors) = run(r#"print -"x";"#);
        assert_eq!(errors, ["Operand of '-' must be a number.\n[line 1]"]);
    }

    #[test]
    fn test_equality() {
        assert_eq!(
            run_ok(r#"print nil == nil; print nil == false; print 1 == 1; print "a" != "a"; print 1 == "1";"#),
            ["true", "false", "true", "false", "false"]
        );
    }

    #[test]
    fn test_logical_operators_return_operands() {
        assert_eq!(
            run_ok(r#"print nil or "yes"; print "left" or boom; print false and boom; print 1 and 2;"#),
            ["yes", "left", "false", "2"]
        );
    }

    #[test]
    fn test_truthiness() {
        assert_eq!(
            run_ok(r#"if (0) print "zero"; if ("") print "empty"; if (nil) print "nil"; else print "falsy";"#),
            ["zero", "empty", "falsy"]
        );
    }

    // ───────────────────────── variables ───────────────────────────

    #[test]
    fn test_shadowing() {
        assert_eq!(
            run_ok(r#"var a = "outer"; { var a = "inner"; print a; } print a;"#),
            ["inner", "outer"]
        );
    }

    #[test]
    fn test_assignment_through_scopes() {
        assert_eq!(
            run_ok("var a = 1; { a = 2; { a = a + 1; } } print a;"),
            ["3"]
        );
    }

    #[test]
    fn test_undefined_variable_read_and_write() {
        let (_, errors) = run("print missing;");
        assert_eq!(errors, ["Undefined variable 'missing'.\n[line 1]"]);

        let (_, errors) = run("missing = 1;");
        assert_eq!(errors, ["Undefined variable 'missing'.\n[line 1]"]);
    }

    #[test]
    fn test_block_restores_environment_after_fault() {
        let output = CaptureOutput::new();
        let mut lox = Lox::with_output(Box::new(output.clone()));

        lox.run(r#"var a = "global"; { var a = "block"; print 1 / 0; }"#);
        assert!(lox.diagnostics().had_runtime_error());

        // Declared at top level, so it must land in the globals again.
        lox.run(r#"var later = "ok"; print later; print a;"#);
        assert_eq!(output.lines(), ["ok", "global"]);
    }

    // ───────────────────────── control flow ────────────────────────

    #[test]
    fn test_while_and_for() {
        assert_eq!(
            run_ok("var i = 0; while (i < 3) { print i; i = i + 1; } for (var j = 0; j < 2; j = j + 1) print j;"),
            ["0", "1", "2", "0", "1"]
        );
    }

    #[test]
    fn test_return_unwinds_loops() {
        let source = "
            fun find(limit) {
                for (var i = 0; ; i = i + 1) {
                    while (true) {
                        if (i * i > limit) return i;
                        i = i + 1;
                    }
                }
            }
            print find(10);
            print \"after\";
        ";

        assert_eq!(run_ok(source), ["4", "after"]);
    }

    // ───────────────────────── functions ───────────────────────────

    #[test]
    fn test_function_without_return_yields_nil() {
        assert_eq!(
            run_ok("fun f() { 1; } print f(); fun g() { return; } print g();"),
            ["nil", "nil"]
        );
    }

    #[test]
    fn test_recursion() {
        assert_eq!(
            run_ok("fun fib(n) { if (n < 2) return n; return fib(n - 1) + fib(n - 2); } print fib(15);"),
            ["610"]
        );
    }

    #[test]
    fn test_runaway_recursion_faults() {
        let runs = run_deep(&[
            "fun count(n) { if (n == 0) return 0; return 1 + count(n - 1); }\n\
             print \"before\";\n\
             print count(100000);\n\
             print \"after\";",
            "print count(500);",
        ]);

        let (lines, errors) = &runs[0];
        assert_eq!(lines, &["before"]);
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("Stack overflow."), "got {:?}", errors);
        assert!(errors[0].contains("[line 1]"), "got {:?}", errors);

        // Depth unwinds with the fault, so the session can recurse again.
        let (lines, errors) = &runs[1];
        assert!(errors.is_empty(), "unexpected errors: {:?}", errors);
        assert_eq!(lines, &["500"]);
    }

    #[test]
    fn test_recursion_up_to_depth_limit() {
        let runs = run_deep(&[
            "fun count(n) { if (n == 0) return 0; return 1 + count(n - 1); }",
            "print count(999);",
        ]);

        assert_eq!(MAX_CALL_DEPTH, 1000);
        assert!(runs[1].1.is_empty(), "unexpected errors: {:?}", runs[1].1);
        assert_eq!(runs[1].0, ["999"]);
    }

    #[test]
    fn test_closure_counter() {
        let source = "
            fun make_counter() {
                var count = 0;
                fun inc() { count = count + 1; return count; }
                return inc;
            }
            var a = make_counter();
            var b = make_counter();
            print a(); print a(); print b();
        ";

        assert_eq!(run_ok(source), ["1", "2", "1"]);
    }

    #[test]
    fn test_closures_share_for_loop_variable() {
        let source = "
            var fs = nil; var gs = nil; var hs = nil;
            for (var i = 0; i < 3; i = i + 1) {
                fun f() { return i; }
                if (i == 0) fs = f;
                if (i == 1) gs = f;
                if (i == 2) hs = f;
            }
            print fs(); print gs(); print hs();
        ";

        // One `i` for the whole loop, already incremented to 3.
        assert_eq!(run_ok(source), ["3", "3", "3"]);
    }

    #[test]
    fn test_closures_capture_per_iteration_copy() {
        let source = "
            var fs = nil; var gs = nil;
            for (var i = 0; i < 2; i = i + 1) {
                var j = i;
                fun f() { return j; }
                if (i == 0) fs = f; else gs = f;
            }
            print fs(); print gs();
        ";

        assert_eq!(run_ok(source), ["0", "1"]);
    }

    #[test]
    fn test_lexical_not_dynamic_scope() {
        let source = r#"
            var a = "global";
            {
                fun show() { print a; }
                show();
                var a = "block";
                show();
            }
        "#;

        assert_eq!(run_ok(source), ["global", "global"]);
    }

    #[test]
    fn test_calling_non_callable() {
        let (_, errors) = run(r#""text"();"#);

        assert_eq!(errors, ["Can only call functions and classes.\n[line 1]"]);
    }

    #[test]
    fn test_arity_mismatch() {
        let (_, errors) = run("fun f(a, b) {} f(1);");

        assert_eq!(errors, ["Expected 2 arguments but got 1.\n[line 1]"]);
    }

    #[test]
    fn test_function_and_native_display() {
        assert_eq!(
            run_ok("fun f() {} print f; print clock;"),
            ["<fn f>", "<native fn>"]
        );
    }

    #[test]
    fn test_clock_returns_a_number() {
        assert_eq!(run_ok("print clock() > 0;"), ["true"]);
    }

    // ───────────────────────── classes ─────────────────────────────

    #[test]
    fn test_super_call() {
        let source = "
            class A { init(x) { this.x = x; } getX() { return this.x; } }
            class B < A { getX() { return super.getX() + 1; } }
            var b = B(5);
            print b.getX();
        ";

        assert_eq!(run_ok(source), ["6"]);
    }

    #[test]
    fn test_super_is_static_not_dynamic() {
        let source = r#"
            class A { name() { return "A"; } }
            class B < A { name() { return "B+" + super.name(); } }
            class C < B { name() { return "C+" + super.name(); } }
            print C().name();
        "#;

        assert_eq!(run_ok(source), ["C+B+A"]);
    }

    #[test]
    fn test_fields_shadow_methods() {
        let source = r#"
            class Box { value() { return "method"; } }
            var b = Box();
            print b.value();
            b.value = "field";
            print b.value;
        "#;

        assert_eq!(run_ok(source), ["method", "field"]);
    }

    #[test]
    fn test_bound_method_keeps_this() {
        let source = r#"
            class Person { init(name) { this.name = name; } greet() { return "hi " + this.name; } }
            var greet = Person("ada").greet;
            print greet();
        "#;

        assert_eq!(run_ok(source), ["hi ada"]);
    }

    #[test]
    fn test_initializer_returns_instance() {
        let source = "
            class P { init() { this.x = 1; return; } }
            var p = P();
            print p.init();
            print p;
            print P;
        ";

        assert_eq!(run_ok(source), ["P instance", "P instance", "P"]);
    }

    #[test]
    fn test_class_arity_comes_from_init() {
        let (_, errors) = run("class P { init(a) {} } P();");
        assert_eq!(errors, ["Expected 1 arguments but got 0.\n[line 1]"]);

        let (_, errors) = run("class Q {} Q(1);");
        assert_eq!(errors, ["Expected 0 arguments but got 1.\n[line 1]"]);
    }

    #[test]
    fn test_property_errors() {
        let (_, errors) = run("class A {} print A().missing;");
        assert_eq!(errors, ["Undefined property 'missing'.\n[line 1]"]);

        let (_, errors) = run("var x = 1; print x.y;");
        assert_eq!(errors, ["Only instances have properties.\n[line 1]"]);

        let (_, errors) = run("var x = 1; x.y = 2;");
        assert_eq!(errors, ["Only instances have fields.\n[line 1]"]);
    }

    #[test]
    fn test_superclass_must_be_a_class() {
        let (_, errors) = run("var NotClass = 1; class A < NotClass {}");

        assert_eq!(errors, ["Superclass must be a class.\n[line 1]"]);
    }

    #[test]
    fn test_class_can_reference_itself() {
        let source = "
            class Node { make() { return Node(); } }
            print Node().make();
        ";

        assert_eq!(run_ok(source), ["Node instance"]);
    }

    // ───────────────────────── session ─────────────────────────────

    #[test]
    fn test_static_errors_prevent_execution() {
        let (lines, errors) = run("print 1;\n{ var a = a; }");

        assert!(lines.is_empty());
        assert_eq!(
            errors,
            ["[line 2] Error at 'a': Can't read local variable in its own initializer."]
        );
    }

    #[test]
    fn test_lexical_errors_are_all_reported() {
        let (lines, errors) = run("print 1; @ #");

        assert!(lines.is_empty());
        assert_eq!(errors.len(), 2);
    }

    #[test]
    fn test_globals_persist_across_runs() {
        let output = CaptureOutput::new();
        let mut lox = Lox::with_output(Box::new(output.clone()));

        lox.run("var n = 1; fun bump() { var step = 1; n = n + step; }");
        lox.run("bump(); bump();");
        lox.run("{ var local = n; print local; }");

        assert!(!lox.diagnostics().had_error());
        assert_eq!(output.lines(), ["3"]);
    }

    #[test]
    fn test_evaluate_echoes_value() {
        let output = CaptureOutput::new();
        let mut lox = Lox::with_output(Box::new(output.clone()));

        let value = lox.evaluate("(1 + 2) * 4");

        assert_eq!(value, Some(Value::Number(12.0)));
        assert_eq!(output.lines(), ["12"]);

        assert_eq!(lox.evaluate("10 / 0"), None);
        assert!(lox.diagnostics().had_runtime_error());
    }

    #[test]
    fn test_diagnostics_carry_message_and_line() {
        let output = CaptureOutput::new();
        let mut lox = Lox::with_output(Box::new(output.clone()));

        lox.run("print 1;\n\nprint nope;");

        let errors = lox.diagnostics().errors();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].is_runtime());
        assert_eq!(errors[0].message(), "Undefined variable 'nope'.");
        assert_eq!(errors[0].line(), 3);

        output.clear();
        lox.diagnostics_mut().reset_static();
        lox.run("print 2;");

        assert_eq!(output.lines(), ["2"]);
        assert!(!lox.diagnostics().had_error());
    }
}

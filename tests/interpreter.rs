#[cfg(test)]
mod interpreter_tests {
    use std::cell::RefCell;
    use std::io;
    use std::rc::Rc;

    use rolox as lox;

    use lox::interpreter::Interpreter;
    use lox::parser::Parser;
    use lox::resolver::Resolver;
    use lox::scanner::Scanner;

    /// `io::Write` handle the test keeps a copy of, so output written through
    /// the interpreter's sink can be read back afterwards.
    #[derive(Clone, Default)]
    struct SharedBuf(Rc<RefCell<Vec<u8>>>);

    impl io::Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.borrow_mut().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl SharedBuf {
        fn contents(&self) -> String {
            String::from_utf8(self.0.borrow().clone()).unwrap()
        }
    }

    /// Full pipeline against `interpreter`; Ok carries nothing (output goes
    /// to the interpreter's sink), Err carries the first rendered diagnostic.
    fn execute(source: &str, interpreter: &mut Interpreter) -> Result<(), String> {
        let tokens = Scanner::new(source.as_bytes().to_vec())
            .scan()
            .map_err(|errors| errors[0].to_string())?;

        let statements = Parser::new(tokens)
            .parse()
            .map_err(|errors| errors[0].to_string())?;

        Resolver::new()
            .resolve(&statements)
            .map_err(|errors| errors[0].to_string())?;

        interpreter
            .interpret(&statements)
            .map_err(|e| e.to_string())
    }

    /// One-shot run: Ok(stdout) or Err(first diagnostic).
    fn run(source: &str) -> Result<String, String> {
        let buf = SharedBuf::default();
        let mut interpreter = Interpreter::with_output(Box::new(buf.clone()));

        execute(source, &mut interpreter)?;

        Ok(buf.contents())
    }

    fn assert_prints(source: &str, expected: &str) {
        match run(source) {
            Ok(out) => assert_eq!(out, expected),
            Err(e) => panic!("program failed: {}", e),
        }
    }

    fn assert_runtime_error(source: &str, needle: &str) {
        match run(source) {
            Ok(out) => panic!("expected runtime error, got output {:?}", out),
            Err(e) => assert!(e.contains(needle), "{}", e),
        }
    }

    // ── end-to-end scenarios ────────────────────────────────────────────

    #[test]
    fn arithmetic_precedence() {
        assert_prints("print 1 + 2 * 3;", "7\n");
    }

    #[test]
    fn string_concatenation() {
        assert_prints("var a = \"foo\"; var b = \"bar\"; print a + b;", "foobar\n");
    }

    #[test]
    fn closure_counter() {
        assert_prints(
            "fun make() { var i = 0; fun inc() { i = i + 1; return i; } return inc; } \
             var c = make(); print c(); print c(); print c();",
            "1\n2\n3\n",
        );
    }

    #[test]
    fn method_call() {
        assert_prints("class A { greet() { print \"hi\"; } } A().greet();", "hi\n");
    }

    #[test]
    fn inherited_initializer_via_super() {
        assert_prints(
            "class A { init(x) { this.x = x; } } \
             class B < A { init(x,y) { super.init(x); this.y = y; } } \
             var b = B(1,2); print b.x; print b.y;",
            "1\n2\n",
        );
    }

    #[test]
    fn for_loop_counts() {
        assert_prints("for (var i = 0; i < 3; i = i + 1) print i;", "0\n1\n2\n");
    }

    // ── value semantics ─────────────────────────────────────────────────

    #[test]
    fn integral_numbers_print_without_fraction() {
        assert_prints("print 5.0; print 2.5; print 10 / 4;", "5\n2.5\n2.5\n");
    }

    #[test]
    fn zero_and_empty_string_are_truthy() {
        assert_prints(
            "if (0) print \"zero\"; if (\"\") print \"empty\"; if (nil) print \"nil\";",
            "zero\nempty\n",
        );
    }

    #[test]
    fn division_by_zero_is_not_an_error() {
        assert_prints("print 1 / 0 > 1000000;", "true\n");
    }

    #[test]
    fn equality_never_crosses_kinds() {
        assert_prints(
            "print 0 == false; print nil == false; print nil == nil; print \"1\" == 1;",
            "false\nfalse\ntrue\nfalse\n",
        );
    }

    #[test]
    fn negation_requires_a_number() {
        assert_runtime_error("print -\"x\";", "Operand must be a number.");
    }

    #[test]
    fn callable_display_forms() {
        assert_prints(
            "fun f() {} class A {} var a = A(); print f; print clock; print A; print a;",
            "<fn f>\n<native fn>\nA\nA instance\n",
        );
    }

    // ── logical operators ───────────────────────────────────────────────

    #[test]
    fn logical_operators_return_the_operand() {
        assert_prints("print nil or \"default\"; print 1 and 2;", "default\n2\n");
    }

    #[test]
    fn short_circuit_skips_the_right_operand() {
        assert_prints(
            "var called = false; \
             fun effect() { called = true; return true; } \
             var r = false and effect(); \
             print called; \
             r = true or effect(); \
             print called; print r;",
            "false\nfalse\ntrue\n",
        );
    }

    // ── functions and closures ──────────────────────────────────────────

    #[test]
    fn function_without_return_yields_nil() {
        assert_prints("fun f() {} print f();", "nil\n");
    }

    #[test]
    fn return_unwinds_through_loops_and_blocks() {
        assert_prints(
            "fun f() { while (true) { { return \"done\"; } } } print f();",
            "done\n",
        );
    }

    #[test]
    fn recursion_works() {
        assert_prints(
            "fun fib(n) { if (n < 2) return n; return fib(n - 1) + fib(n - 2); } print fib(10);",
            "55\n",
        );
    }

    #[test]
    fn closures_capture_their_lexical_scope() {
        // The classic shadowing probe: the closure sees the binding that was
        // in scope at declaration, not the later shadow.
        assert_prints(
            "var a = \"global\"; \
             { \
               fun showA() { print a; } \
               showA(); \
               var a = \"block\"; \
               showA(); \
             }",
            "global\nglobal\n",
        );
    }

    #[test]
    fn each_closure_gets_its_own_environment() {
        assert_prints(
            "fun make() { var i = 0; fun inc() { i = i + 1; return i; } return inc; } \
             var a = make(); var b = make(); \
             print a(); print a(); print b();",
            "1\n2\n1\n",
        );
    }

    #[test]
    fn clock_is_pre_bound_and_zero_arity() {
        assert_prints("print clock() > 0;", "true\n");
        assert_runtime_error("clock(1);", "Expected 0 arguments but got 1.");
    }

    // ── classes ─────────────────────────────────────────────────────────

    #[test]
    fn fields_shadow_methods() {
        assert_prints(
            "class A { m() { return \"method\"; } } \
             var a = A(); \
             a.m = \"field\"; \
             print a.m;",
            "field\n",
        );
    }

    #[test]
    fn methods_see_this_through_binding() {
        assert_prints(
            "class Counter { init() { this.n = 0; } bump() { this.n = this.n + 1; return this.n; } } \
             var c = Counter(); \
             var m1 = c.bump; \
             var m2 = c.bump; \
             print m1(); print m2();",
            "1\n2\n",
        );
    }

    #[test]
    fn initializer_always_returns_the_instance() {
        assert_prints("class C { init() { return; } } print C();", "C instance\n");

        // Calling init explicitly re-runs it and still yields the instance.
        assert_prints(
            "class C { init() { this.x = 1; } } var c = C(); print c.init();",
            "C instance\n",
        );
    }

    #[test]
    fn class_arity_follows_its_initializer() {
        assert_runtime_error(
            "class A { init(x) {} } A();",
            "Expected 1 arguments but got 0.",
        );
        assert_prints("class A {} print A();", "A instance\n");
    }

    #[test]
    fn initializer_is_inherited() {
        assert_prints(
            "class A { init(x) { this.x = x; } } class B < A {} print B(5).x;",
            "5\n",
        );
    }

    #[test]
    fn methods_resolve_up_the_superclass_chain() {
        assert_prints(
            "class A { m() { print \"A\"; } } \
             class B < A { m() { print \"B\"; super.m(); } } \
             class C < B {} \
             C().m();",
            "B\nA\n",
        );
    }

    #[test]
    fn super_skips_the_receivers_own_class() {
        // From a B method, super.m must reach A::m even when the receiver
        // overrides m.
        assert_prints(
            "class A { m() { print \"A\"; } } \
             class B < A { test() { super.m(); } m() { print \"B\"; } } \
             B().test();",
            "A\n",
        );
    }

    #[test]
    fn instances_share_identity_not_fields() {
        assert_prints(
            "class A {} \
             var a = A(); var b = a; \
             b.x = 1; print a.x; \
             print a == b; print a == A();",
            "1\ntrue\nfalse\n",
        );
    }

    // ── runtime errors ──────────────────────────────────────────────────

    #[test]
    fn adding_string_and_number_fails() {
        assert_runtime_error(
            "print \"a\" + 1;",
            "Operands must be two numbers or two strings.",
        );
    }

    #[test]
    fn arity_mismatch_fails() {
        assert_runtime_error(
            "fun f() { return 1; } var x = f(1);",
            "Expected 0 arguments but got 1.",
        );
    }

    #[test]
    fn calling_a_non_callable_fails() {
        assert_runtime_error("var x = 1; x();", "Can only call functions and classes.");
    }

    #[test]
    fn undefined_variable_fails_with_line() {
        match run("var a = 1;\nprint b;") {
            Ok(out) => panic!("expected error, got {:?}", out),
            Err(e) => {
                assert!(e.contains("Undefined variable 'b'."), "{}", e);
                assert!(e.contains("[line 2]"), "{}", e);
            }
        }
    }

    #[test]
    fn undefined_property_fails() {
        assert_runtime_error("class A {} A().missing;", "Undefined property 'missing'.");
    }

    #[test]
    fn properties_require_an_instance() {
        assert_runtime_error("var x = 1; x.field;", "Only instances have properties.");
        assert_runtime_error("var x = 1; x.field = 2;", "Only instances have fields.");
    }

    #[test]
    fn superclass_must_be_a_class() {
        assert_runtime_error("var NotAClass = 1; class A < NotAClass {}", "Superclass must be a class.");
    }

    // ── recursion cap ───────────────────────────────────────────────────

    #[test]
    fn runaway_recursion_reports_stack_overflow() {
        assert_runtime_error("fun f() { f(); } f();", "Stack overflow.");
    }

    #[test]
    fn call_depth_cap_is_configurable() {
        let buf = SharedBuf::default();
        let mut interpreter = Interpreter::with_output(Box::new(buf.clone()));
        interpreter.set_max_call_depth(8);

        let source =
            "fun down(n) { if (n == 0) return 0; return down(n - 1); } print down(7);";
        execute(source, &mut interpreter).expect("seven frames fit under a cap of eight");
        assert_eq!(buf.contents(), "0\n");

        let mut interpreter = Interpreter::with_output(Box::new(SharedBuf::default()));
        interpreter.set_max_call_depth(8);

        let source = "fun down(n) { if (n == 0) return 0; return down(n - 1); } print down(50);";
        let err = execute(source, &mut interpreter).unwrap_err();
        assert!(err.contains("Stack overflow."), "{}", err);
    }

    // ── interpreter state across programs ───────────────────────────────

    #[test]
    fn globals_persist_across_programs() {
        let buf = SharedBuf::default();
        let mut interpreter = Interpreter::with_output(Box::new(buf.clone()));

        execute("var a = 1; fun next() { a = a + 1; return a; }", &mut interpreter).unwrap();
        execute("print next(); print next();", &mut interpreter).unwrap();

        assert_eq!(buf.contents(), "2\n3\n");
    }

    #[test]
    fn interpreter_survives_a_runtime_error() {
        let buf = SharedBuf::default();
        let mut interpreter = Interpreter::with_output(Box::new(buf.clone()));

        assert!(execute("print 1 + \"x\";", &mut interpreter).is_err());

        execute("print \"still alive\";", &mut interpreter).unwrap();
        assert_eq!(buf.contents(), "still alive\n");
    }
}

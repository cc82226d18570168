mod quality_tests;

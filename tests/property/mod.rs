mod diff_properties;
